//! Example 01: Basic CRUD Operations
//!
//! This example demonstrates the fundamental create, read, update, and delete
//! operations with Rollbook, using a file-backed store.
//!
//! Run with: cargo run --example 01_basic_crud

use eyre::Result;
use rollbook::{NewStudent, Store, StudentChanges};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("roster.db");

    println!("Rollbook Basic CRUD Example");
    println!("===========================\n");
    println!("Database path: {}\n", db_path.display());

    // Open (or create) the store
    let mut store = Store::open(&db_path)?;
    println!("Store opened successfully.\n");

    // CREATE: Add a new student
    println!("1. CREATE - Adding a new student...");
    let student = store.insert(NewStudent::new("Grace Hopper", "grace.hopper@yale.edu", 9))?;
    println!("   Created student with ID: {}", student.id);
    println!("   Enrolled at: {}\n", student.enrolled_date);

    // READ: Retrieve the student
    println!("2. READ - Retrieving the student...");
    let retrieved = store.get(student.id)?;
    match &retrieved {
        Some(student) => {
            println!("   Found student:");
            println!("   - ID: {}", student.id);
            println!("   - Name: {}", student.name);
            println!("   - Email: {}", student.email);
            println!("   - Grade: {}", student.grade);
        }
        None => println!("   Student not found!"),
    }
    println!();

    // UPDATE: Modify the student
    println!("3. UPDATE - Modifying the student...");
    if let Some(student) = retrieved {
        let updated = store.update(&student, StudentChanges::default().grade(10))?;
        println!("   Student updated successfully.");
        println!("   Verified update: {}\n", updated);

        // Constraints are re-checked on update
        match store.update(&updated, StudentChanges::default().grade(13)) {
            Ok(_) => println!("   Grade 13 accepted?!"),
            Err(e) => println!("   Grade 13 rejected: {}\n", e),
        }
    }

    // LIST: Show all students
    println!("4. LIST - Showing all students...");
    let all_students = store.query(&Default::default())?;
    println!("   Total students: {}", all_students.len());
    for student in &all_students {
        println!("   - {}", student);
    }
    println!();

    // DELETE: Remove the student
    println!("5. DELETE - Removing the student...");
    store.delete(&student)?;
    println!("   Student deleted.\n");

    // Verify deletion
    let deleted = store.get(student.id)?;
    println!("   Verification: Student exists = {}\n", deleted.is_some());

    println!("Example complete!");
    Ok(())
}
