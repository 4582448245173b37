//! Account commands
//!
//! Usage: claritydash users <list|show|signup|login|rename|set-tier|delete>

use clap::{Args, Subcommand};
use claritydash_core::model::{EntityKey, SubscriptionTier, User, UserPatch};
use claritydash_core::ExErrorKind;
use claritydash_store::Storage;
use sha2::{Digest, Sha256};

use super::CliResult;

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List every account (seeding first if needed)
    List,
    /// Show one account
    Show {
        /// Account email
        email: String,
    },
    /// Create a free-tier account
    Signup(SignupArgs),
    /// Check an account's password
    Login(LoginArgs),
    /// Change an account's display name
    Rename(RenameArgs),
    /// Change an account's subscription tier
    SetTier(SetTierArgs),
    /// Delete an account
    Delete {
        /// Account email
        email: String,
    },
}

#[derive(Debug, Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct SetTierArgs {
    #[arg(long)]
    pub email: String,
    /// free, pro or premium
    #[arg(long)]
    pub tier: SubscriptionTier,
}

/// Execute users command
pub fn execute(storage: &Storage, args: UsersArgs) -> CliResult {
    let users = storage.entities::<User>();

    match args.command {
        UsersCommand::List => {
            users.ensure_default_seed()?;
            for user in users.list_entities()? {
                println!("{}\t{}\t{}", user.email, user.name, user.subscription_tier);
            }
        }
        UsersCommand::Show { email } => {
            let user = users.read(&EntityKey::parse(email)?)?;
            println!("{}", serde_json::to_string_pretty(&user.profile())?);
        }
        UsersCommand::Signup(args) => {
            let user = User::new(args.name, args.email, hash_password(&args.password));
            let created = users.insert(&user)?;
            println!("✓ Created {}", created.email);
        }
        UsersCommand::Login(args) => {
            let key = EntityKey::parse(args.email)?;
            let user = match users.read(&key) {
                Ok(user) => user,
                Err(e) if e.kind() == ExErrorKind::NotFound => {
                    return Err("invalid email or password".into())
                }
                Err(e) => return Err(e.into()),
            };
            if !verify_password(&args.password, user.password_hash.expose()) {
                return Err("invalid email or password".into());
            }
            println!("{}", serde_json::to_string_pretty(&user.profile())?);
        }
        UsersCommand::Rename(args) => {
            let key = EntityKey::parse(args.email)?;
            let user = users.patch(&key, &UserPatch::name(args.name))?;
            println!("✓ {} is now {}", user.email, user.name);
        }
        UsersCommand::SetTier(args) => {
            let key = EntityKey::parse(args.email)?;
            let user = users.patch(&key, &UserPatch::tier(args.tier))?;
            println!("✓ {} is now on {}", user.email, user.subscription_tier);
        }
        UsersCommand::Delete { email } => {
            let key = EntityKey::parse(email)?;
            users.delete(&key)?;
            println!("✓ Deleted {}", key);
        }
    }

    Ok(())
}

/// Lower-case hex SHA-256 of the password
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}
