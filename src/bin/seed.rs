use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use ledgerfeed::{
    AccountType, NewTransaction, create_transaction, create_user, initialize_db,
};

/// A utility for creating a seeded database for the ledgerfeed server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The password for the demo user.
    #[arg(long, default_value = "password")]
    password: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo user...");
    let password_hash = bcrypt::hash(&args.password, bcrypt::DEFAULT_COST)?;
    let user = create_user("Demo User", "demo@example.com", &password_hash, &conn)?;

    println!("Creating sample transactions...");
    let samples = [
        (100.50, "Weekly groceries", AccountType::Checking),
        (2_500.00, "Salary", AccountType::Checking),
        (19.99, "Streaming subscription", AccountType::Credit),
        (500.00, "Emergency fund top-up", AccountType::Savings),
        (42.00, "Petrol", AccountType::Credit),
    ];

    for (amount, description, account_type) in samples {
        create_transaction(
            NewTransaction {
                user_id: user.id,
                amount,
                description: description.to_owned(),
                account_type,
            },
            &conn,
        )?;
    }

    println!("Success!");

    Ok(())
}
