//! Example 02: Filtering, Ordering and Limits
//!
//! This example demonstrates how to combine filters with ordering and limits,
//! and how bulk updates and deletes behave.
//!
//! Run with: cargo run --example 02_querying

use eyre::Result;
use rollbook::{Field, Filter, FilterOp, NewStudent, Query, Store, StudentChanges};

fn main() -> Result<()> {
    println!("Rollbook Querying Example");
    println!("=========================\n");

    let mut store = Store::open_in_memory()?;

    // Create sample students
    println!("Creating sample students...\n");
    let students = store.insert_many(vec![
        NewStudent::new("Albert Einstein", "albert.einstein@zurich.edu", 6),
        NewStudent::new("Alan Turing", "alan.turing@sherborne.edu", 11),
        NewStudent::new("Ada Lovelace", "ada.lovelace@london.ac.uk", 8),
        NewStudent::new("Marie Curie", "marie.curie@sorbonne.fr", 11),
        NewStudent::new("Niels Bohr", "niels.bohr@copenhagen.dk", 3),
    ])?;
    for student in &students {
        println!("  Created: {}", student);
    }
    println!();

    // Query 1: Ordered by name
    println!("1. Order by name:");
    for student in store.query(&Query::new().order_by(Field::Name))? {
        println!("   - {}", student.name);
    }
    println!();

    // Query 2: Highest grade (ties go to whoever was inserted first)
    println!("2. Order by grade DESC, limit 1:");
    if let Some(top) = store.first(&Query::new().order_by(Field::Grade).descending())? {
        println!("   - {} (grade={})", top.name, top.grade);
    }
    println!();

    // Query 3: Substring match
    println!("3. Filter by name containing 'al':");
    let als = store.query(&Query::new().filter(Filter::contains(Field::Name, "al")))?;
    for student in &als {
        println!("   - {}", student.name);
    }
    println!("   Found: {} students\n", als.len());

    // Query 4: Multiple filters (AND logic)
    println!("4. Filter by grade >= 6 AND grade < 11:");
    let middle = Query::new()
        .filter(Filter::new(Field::Grade, FilterOp::Gte, 6))
        .filter(Filter::new(Field::Grade, FilterOp::Lt, 11));
    for student in store.query(&middle)? {
        println!("   - {} (grade={})", student.name, student.grade);
    }
    println!("   Count: {}\n", store.count(&middle.filters)?);

    // Bulk update: all or nothing
    println!("5. Promote grade 11 students:");
    let seniors = [Filter::eq(Field::Grade, 11)];
    let promoted = store.update_where(&seniors, |s| StudentChanges::default().grade(s.grade + 1))?;
    println!("   Promoted: {}", promoted);
    match store.update_where(&[], |s| StudentChanges::default().grade(s.grade + 1)) {
        Ok(_) => println!("   Promoted everyone?!"),
        Err(e) => println!("   Promoting everyone again failed: {}", e),
    }
    println!("   Students in grade 12: {}\n", store.count(&[Filter::eq(Field::Grade, 12)])?);

    // Bulk delete
    println!("6. Delete students below grade 5:");
    let removed = store.delete_where(&[Filter::new(Field::Grade, FilterOp::Lt, 5)])?;
    println!("   Removed: {}, remaining: {}\n", removed, store.count(&[])?);

    println!("Example complete!");
    Ok(())
}
