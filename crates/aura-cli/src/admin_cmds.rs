//! Operator CLI handlers for tenants, users and their access tokens.
//!
//! Implements:
//! - `aura school add` / `aura school list`
//! - `aura user add` / `aura user list`
//! - `aura token issue <username>` -- print a bearer token for a user
//! - `aura token revoke <username>` -- invalidate every token issued so far

use anyhow::{Context, Result, anyhow, bail};
use sqlx::PgPool;

use aura_core::token::{TokenConfig, generate_token};
use aura_db::models::{Role, School, User};
use aura_db::queries::schools::{self, NewSchool};
use aura_db::queries::users::{self, NewUser};

use crate::{SchoolCommands, TokenCommands, UserCommands};

// -----------------------------------------------------------------------
// aura school
// -----------------------------------------------------------------------

pub async fn run_school_command(command: SchoolCommands, pool: &PgPool) -> Result<()> {
    match command {
        SchoolCommands::Add {
            name,
            code,
            address,
            phone,
            email,
        } => {
            let new = NewSchool {
                name,
                code,
                address: address.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
                email: email.unwrap_or_default(),
            };
            let school = schools::insert_school(pool, &new).await.with_context(|| {
                format!("failed to add school {:?} (is the code already taken?)", new.code)
            })?;

            println!("School created:");
            println!("  ID:   {}", school.id);
            println!("  Name: {}", school.name);
            println!("  Code: {}", school.code);
            Ok(())
        }
        SchoolCommands::List => {
            let all = schools::list_schools(pool).await?;
            if all.is_empty() {
                println!("No schools found. Use `aura school add` to create one.");
                return Ok(());
            }
            print_schools(&all);
            Ok(())
        }
    }
}

fn print_schools(all: &[School]) {
    let code_w = all.iter().map(|s| s.code.len()).max().unwrap_or(4).max(4);
    let name_w = all.iter().map(|s| s.name.len()).max().unwrap_or(4).max(4);

    println!("{:<code_w$}  {:<name_w$}  {:<36}  ACTIVE", "CODE", "NAME", "ID");
    for school in all {
        println!(
            "{:<code_w$}  {:<name_w$}  {:<36}  {}",
            school.code,
            school.name,
            school.id.to_string(),
            school.active,
        );
    }
}

async fn school_by_code(pool: &PgPool, code: &str) -> Result<School> {
    schools::get_school_by_code(pool, code)
        .await?
        .ok_or_else(|| anyhow!("school with code {code:?} not found"))
}

// -----------------------------------------------------------------------
// aura user
// -----------------------------------------------------------------------

pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Add {
            username,
            school,
            role,
            email,
            first_name,
            last_name,
        } => {
            let role: Role = role.parse().map_err(|_| {
                let expected: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
                anyhow!("invalid role {role:?}; expected one of: {}", expected.join(", "))
            })?;
            let school = school_by_code(pool, &school).await?;

            let new = NewUser {
                username,
                email: email.unwrap_or_default(),
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                role,
                bio: String::new(),
                phone: String::new(),
            };
            let user = users::insert_user(pool, school.id, &new)
                .await
                .with_context(|| {
                    format!("failed to add user {:?} (is the username already taken?)", new.username)
                })?;

            println!("User created:");
            println!("  ID:       {}", user.id);
            println!("  Username: {}", user.username);
            println!("  Role:     {}", user.role);
            println!("  School:   {} ({})", school.name, school.code);
            println!();
            println!("Next: run `aura token issue {}` to get an API token.", user.username);
            Ok(())
        }
        UserCommands::List { school } => {
            let school_id = match school.as_deref() {
                Some(code) => Some(school_by_code(pool, code).await?.id),
                None => None,
            };
            let all = users::list_all_users(pool, school_id).await?;
            if all.is_empty() {
                println!("No users found. Use `aura user add` to create one.");
                return Ok(());
            }
            print_users(&all);
            Ok(())
        }
    }
}

fn print_users(all: &[User]) {
    let user_w = all.iter().map(|u| u.username.len()).max().unwrap_or(8).max(8);
    let role_w = all
        .iter()
        .map(|u| u.role.as_str().len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!("{:<user_w$}  {:<role_w$}  {:<36}  ACTIVE", "USERNAME", "ROLE", "ID");
    for user in all {
        println!(
            "{:<user_w$}  {:<role_w$}  {:<36}  {}",
            user.username,
            user.role.as_str(),
            user.id.to_string(),
            user.is_active,
        );
    }
}

// -----------------------------------------------------------------------
// aura token
// -----------------------------------------------------------------------

pub async fn run_token_command(
    command: TokenCommands,
    pool: &PgPool,
    token_config: &TokenConfig,
) -> Result<()> {
    match command {
        TokenCommands::Issue { username } => {
            let user = user_by_username(pool, &username).await?;
            if !user.is_active {
                bail!("user {username:?} is inactive");
            }
            let token = generate_token(token_config, user.id, user.token_version);
            tracing::info!(user_id = %user.id, version = user.token_version, "issued token");
            println!("{token}");
            Ok(())
        }
        TokenCommands::Revoke { username } => {
            let user = user_by_username(pool, &username).await?;
            let version = users::bump_token_version(pool, user.id).await?;
            tracing::info!(user_id = %user.id, version, "revoked tokens");
            println!("Revoked all tokens for {username}. Issue a new one with `aura token issue {username}`.");
            Ok(())
        }
    }
}

async fn user_by_username(pool: &PgPool, username: &str) -> Result<User> {
    users::get_user_by_username(pool, username)
        .await?
        .ok_or_else(|| anyhow!("user {username:?} not found"))
}
