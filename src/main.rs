use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use rollbook::{DatabaseUrl, Field, Filter, NewStudent, Query, Store, Student, StudentChanges, Value};
use std::io::Write;

#[derive(Parser)]
#[command(name = "rollbook")]
#[command(about = "Rollbook CLI - student roster with named constraints on SQLite")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Database URL: sqlite:///:memory:, sqlite:///relative.db or sqlite:////absolute.db
    #[arg(short, long, env = "ROLLBOOK_DATABASE", default_value = "sqlite:///:memory:")]
    database: DatabaseUrl,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through inserting, querying, updating and deleting students
    Demo,

    /// Add a student
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        grade: i64,
        /// Birthday as YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        birthday: Option<NaiveDateTime>,
    },

    /// List students
    List(ListArgs),

    /// Count students
    Count,

    /// Move every student up one grade (all or nothing)
    Promote,

    /// Remove every student with the given name
    Remove {
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only students whose name contains this text
    #[arg(long)]
    name_like: Option<String>,
    /// Only students in this grade
    #[arg(long)]
    grade: Option<i64>,
    /// Field to order by (default: id)
    #[arg(long)]
    order_by: Option<Field>,
    /// Order descending
    #[arg(long)]
    desc: bool,
    /// Maximum number of students to show
    #[arg(long)]
    limit: Option<usize>,
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(needle) = &self.name_like {
            query = query.filter(Filter::contains(Field::Name, needle.clone()));
        }
        if let Some(grade) = self.grade {
            query = query.filter(Filter::eq(Field::Grade, grade));
        }
        if let Some(field) = self.order_by {
            query = query.order_by(field);
        }
        if self.desc {
            query = query.descending();
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable (e.g. `list --json`)
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    // Open store
    let mut store = Store::connect(&cli.database).with_context(|| format!("Failed to open {}", cli.database))?;

    match cli.command {
        Commands::Demo => run_demo(&mut store, out)?,
        Commands::Add {
            name,
            email,
            grade,
            birthday,
        } => {
            let mut student = NewStudent::new(name, email, grade);
            student.birthday = birthday;
            let student = store.insert(student).context("Failed to add student")?;
            writeln!(out, "Added {}", student)?;
        }
        Commands::List(args) => {
            let students = store.query(&args.to_query())?;
            if args.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&students)?)?;
            } else {
                print_students(out, &students)?;
            }
        }
        Commands::Count => {
            writeln!(out, "{}", store.count(&[])?)?;
        }
        Commands::Promote => {
            let count = store
                .update_where(&[], |s| StudentChanges::default().grade(s.grade + 1))
                .context("Failed to promote students")?;
            writeln!(out, "Promoted {} students", count)?;
        }
        Commands::Remove { name } => {
            let removed = store.delete_where(&[Filter::eq(Field::Name, name)])?;
            writeln!(out, "Removed {} students", removed)?;
        }
    }

    Ok(())
}

fn parse_date(s: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {:?}: {}", s, e))?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date {:?}", s))
}


fn print_students(out: &mut impl Write, students: &[Student]) -> Result<()> {
    if students.is_empty() {
        writeln!(out, "   (none)")?;
    }
    for student in students {
        writeln!(out, "   {}", student)?;
    }
    Ok(())
}

fn heading(out: &mut impl Write, step: usize, title: &str) -> Result<()> {
    writeln!(out, "\n{}", format!("{}. {}", step, title).bold())?;
    Ok(())
}

fn run_demo(store: &mut Store, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", "Rollbook Walkthrough".bold().underline())?;

    heading(out, 1, "INSERT - two students in one batch")?;
    let birthday = |y, m, d| {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| eyre!("invalid demo date {}-{}-{}", y, m, d))
    };
    let inserted = store.insert_many(vec![
        NewStudent::new("Albert Einstein", "albert.einstein@zurich.edu", 6).with_birthday(birthday(1879, 3, 14)?),
        NewStudent::new("Alan Turing", "alan.turing@sherborne.edu", 11).with_birthday(birthday(1912, 6, 23)?),
    ])?;
    print_students(out, &inserted)?;

    heading(out, 2, "CONSTRAINTS - a duplicate email is rejected")?;
    match store.insert(NewStudent::new("Impostor", "albert.einstein@zurich.edu", 3)) {
        Ok(student) => writeln!(out, "   unexpectedly inserted {}", student)?,
        Err(e) => writeln!(out, "   {}", e.to_string().red())?,
    }

    heading(out, 3, "QUERY - all students (primary key order)")?;
    print_students(out, &store.query(&Query::new())?)?;

    heading(out, 4, "QUERY - names only")?;
    let names: Vec<String> = store.query(&Query::new())?.into_iter().map(|s| s.name).collect();
    writeln!(out, "   {:?}", names)?;

    heading(out, 5, "ORDER BY name")?;
    let by_name: Vec<String> = store
        .query(&Query::new().order_by(Field::Name))?
        .into_iter()
        .map(|s| s.name)
        .collect();
    writeln!(out, "   {:?}", by_name)?;

    heading(out, 6, "ORDER BY grade DESC")?;
    for student in store.query(&Query::new().order_by(Field::Grade).descending())? {
        writeln!(out, "   ({:?}, {})", student.name, student.grade)?;
    }

    heading(out, 7, "LIMIT 1 on grade DESC")?;
    for student in store.query(&Query::new().order_by(Field::Grade).descending().limit(1))? {
        writeln!(out, "   ({:?}, {:?})", student.name, student.birthday)?;
    }

    heading(out, 8, "FIRST on grade DESC")?;
    match store.first(&Query::new().order_by(Field::Grade).descending())? {
        Some(student) => writeln!(out, "   ({:?}, {:?})", student.name, student.birthday)?,
        None => writeln!(out, "   None")?,
    }

    heading(out, 9, "COUNT")?;
    writeln!(out, "   {}", store.count(&[])?)?;

    heading(out, 10, "FILTER name LIKE %Alan% AND grade = 11")?;
    let query = Query::new()
        .filter(Filter::contains(Field::Name, "Alan"))
        .filter(Filter::eq(Field::Grade, 11));
    for student in store.query(&query)? {
        writeln!(out, "   {}", student.name)?;
    }

    heading(out, 11, "UPDATE - everyone moves up a grade")?;
    store.update_where(&[], |s| StudentChanges::default().grade(s.grade + 1))?;
    for student in store.query(&Query::new())? {
        writeln!(out, "   ({:?}, {})", student.name, student.grade)?;
    }

    heading(out, 12, "DELETE - Albert Einstein")?;
    let query = Query::new().filter(Filter::eq(Field::Name, Value::from("Albert Einstein")));
    if let Some(albert) = store.first(&query)? {
        store.delete(&albert)?;
    }
    writeln!(out, "   after delete: {:?}", store.first(&query)?.map(|s| s.to_string()))?;

    heading(out, 13, "DELETE WHERE - by query")?;
    let removed = store.delete_where(&query.filters)?;
    writeln!(
        out,
        "   removed {}, after delete: {:?}",
        removed,
        store.first(&query)?.map(|s| s.to_string())
    )?;

    writeln!(out, "\n{} {} student(s) left", "Done.".green(), store.count(&[])?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rollbook").chain(args.iter().copied())).unwrap()
    }

    fn run_to_string(args: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        run(cli(args), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn list_args(args: &[&str]) -> ListArgs {
        let mut full = vec!["list"];
        full.extend_from_slice(args);
        match cli(&full).command {
            Commands::List(args) => args,
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn test_parse_date() {
        let parsed = parse_date("1912-06-23").unwrap();
        assert_eq!(parsed.to_string(), "1912-06-23 00:00:00");

        assert!(parse_date("1912-13-01").is_err());
        assert!(parse_date("23/06/1912").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_birthday_flag_rejects_bad_dates() {
        let result = Cli::try_parse_from([
            "rollbook", "add", "--name", "A", "--email", "a@b.edu", "--grade", "3", "--birthday", "yesterday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_database_flag() {
        let parsed = cli(&["--database", "sqlite:////tmp/roster.db", "count"]);
        assert_eq!(parsed.database, DatabaseUrl::File("/tmp/roster.db".into()));

        if std::env::var_os("ROLLBOOK_DATABASE").is_none() {
            assert_eq!(cli(&["count"]).database, DatabaseUrl::Memory);
        }

        assert!(Cli::try_parse_from(["rollbook", "--database", "postgres://x/y", "count"]).is_err());
    }

    #[test]
    fn test_list_flags_map_to_query() {
        assert_eq!(list_args(&[]).to_query(), Query::new());

        let query = list_args(&[
            "--name-like",
            "Alan",
            "--grade",
            "11",
            "--order-by",
            "name",
            "--desc",
            "--limit",
            "2",
        ])
        .to_query();
        assert_eq!(
            query,
            Query::new()
                .filter(Filter::contains(Field::Name, "Alan"))
                .filter(Filter::eq(Field::Grade, 11i64))
                .order_by(Field::Name)
                .descending()
                .limit(2)
        );

        assert!(Cli::try_parse_from(["rollbook", "list", "--order-by", "age"]).is_err());
    }

    #[test]
    fn test_list_json_output_is_pure_json() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("roster.db");
        let db = db.to_str().unwrap();

        run_to_string(&["--database", db, "add", "--name", "Alan Turing", "--email", "alan@sherborne.edu", "--grade", "11", "--birthday", "1912-06-23"]).unwrap();
        run_to_string(&["--database", db, "add", "--name", "Albert Einstein", "--email", "albert@zurich.edu", "--grade", "6"]).unwrap();

        let output = run_to_string(&["--database", db, "list", "--json", "--order-by", "grade"]).unwrap();
        let students: Vec<Student> = serde_json::from_str(&output).unwrap();
        let names: Vec<&str> = students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Albert Einstein", "Alan Turing"]);
        assert!(students[1].birthday.is_some());
    }

    #[test]
    fn test_promote_and_remove() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("roster.db");
        let db = db.to_str().unwrap();

        run_to_string(&["--database", db, "add", "--name", "Senior", "--email", "senior@school.edu", "--grade", "11"]).unwrap();
        assert_eq!(run_to_string(&["--database", db, "promote"]).unwrap(), "Promoted 1 students\n");

        // A second promotion would push the senior past grade 12
        let err = run_to_string(&["--database", db, "promote"]).unwrap_err();
        assert!(format!("{:#}", err).contains("grade_between_1_and_12"));

        assert_eq!(run_to_string(&["--database", db, "remove", "--name", "Senior"]).unwrap(), "Removed 1 students\n");
        assert_eq!(run_to_string(&["--database", db, "remove", "--name", "Senior"]).unwrap(), "Removed 0 students\n");
        assert_eq!(run_to_string(&["--database", db, "count"]).unwrap(), "0\n");
    }

    #[test]
    fn test_add_rejects_constraint_violation() {
        let err = run_to_string(&["add", "--name", "Too Old", "--email", "old@school.edu", "--grade", "13"]).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to add student"));
    }

    #[test]
    fn test_demo_runs_in_memory() {
        let output = run_to_string(&["demo"]).unwrap();
        assert!(output.contains("Alan Turing"));
        assert!(output.contains("unique_email"));
        assert!(output.contains("after delete: None"));
    }
}
