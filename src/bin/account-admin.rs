//! Account Administration CLI
//!
//! Manages accounts directly against the database: create, list and delete
//! users, and apply migrations.

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use uuid::Uuid;

use account_service::{
    config::LoggingConfig,
    database::{run_migrations, DatabaseConfig},
    models::NewUser,
    service::UserService,
    utils::{logging::init_logging, security::DEFAULT_BCRYPT_COST},
};

/// Account administration CLI
#[derive(Parser)]
#[command(name = "account-admin", about = "Account administration CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user with an empty profile
    CreateUser(CreateUserArgs),
    /// List all users, oldest first
    ListUsers,
    /// Delete a user and its profile
    DeleteUser(DeleteUserArgs),
    /// Apply pending database migrations
    Migrate,
}

#[derive(Args)]
struct CreateUserArgs {
    /// Login email
    #[arg(short, long)]
    email: String,

    /// Password for the new account
    #[arg(short, long)]
    password: String,

    /// Display name; defaults to the part of the email before the `@`
    #[arg(short, long)]
    username: Option<String>,
}

#[derive(Args)]
struct DeleteUserArgs {
    /// User ID
    #[arg(long, conflicts_with = "email", required_unless_present = "email")]
    id: Option<Uuid>,

    /// Login email
    #[arg(long)]
    email: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging(&LoggingConfig {
        file: None,
        ..LoggingConfig::default()
    })?;

    let cli = Cli::parse();

    let database_pool = DatabaseConfig::from_env().create_pool().await?;
    run_migrations(&database_pool).await?;

    let bcrypt_cost = account_service::config::env::get_u32("BCRYPT_COST", DEFAULT_BCRYPT_COST);
    let service = UserService::new(database_pool).with_bcrypt_cost(bcrypt_cost);

    match cli.command {
        Commands::CreateUser(args) => create_user(&service, args).await?,
        Commands::ListUsers => list_users(&service).await?,
        Commands::DeleteUser(args) => delete_user(&service, args).await?,
        Commands::Migrate => println!("Migrations are up to date."),
    }

    Ok(())
}

async fn create_user(
    service: &UserService,
    args: CreateUserArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = service
        .create_user_with_profile(NewUser {
            email: args.email,
            username: args.username,
            password: args.password,
        })
        .await?;

    println!("User created.");
    println!("   ID: {}", user.id);
    println!("   Username: {}", user.username);
    println!("   Email: {}", user.email);

    Ok(())
}

async fn list_users(service: &UserService) -> Result<(), Box<dyn std::error::Error>> {
    let users = service.list_users().await?;

    if users.is_empty() {
        println!("No users found.");
        println!("Create one with: account-admin create-user --email you@example.com --password '...'");
        return Ok(());
    }

    println!("{:<36}  {:<24}  {:<32}  {}", "ID", "USERNAME", "EMAIL", "LAST LOGIN");
    for user in users {
        let last_login = user
            .last_login
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<36}  {:<24}  {:<32}  {}",
            user.id, user.username, user.email, last_login
        );
    }

    Ok(())
}

async fn delete_user(
    service: &UserService,
    args: DeleteUserArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = match (args.id, args.email) {
        (Some(id), _) => id,
        (None, Some(email)) => service.get_user_by_email(&email).await?.id,
        (None, None) => return Err("Either --id or --email is required".into()),
    };

    service.delete_user(user_id).await?;
    println!("User {} deleted.", user_id);

    Ok(())
}
