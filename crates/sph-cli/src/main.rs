use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use color_eyre::eyre::{Context, Result, eyre};
use sph_core::{FieldErrors, SignUpForm, SmsSettingsForm, write_contacts_csv};
use sph_db::{Contact, SphDb, User};

const SESSION_TTL_SECS: i64 = 14 * 24 * 3600;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("sph_cli=info".parse()?)
                .add_directive("sph_db=info".parse()?)
                .add_directive("sph_core=info".parse()?),
        )
        .init();

    let db = match std::env::var_os("SPH_DATABASE") {
        Some(path) => SphDb::new_with_path(&PathBuf::from(path)).await,
        None => SphDb::new().await,
    }
    .wrap_err("Failed to open database")?;

    loop {
        print_menu();
        let choice = read_line("Choice: ")?;

        let outcome = match choice.trim() {
            "1" => create_user(&db).await,
            "2" => list_users(&db).await,
            "3" => reset_password(&db).await,
            "4" => show_counts(&db).await,
            "5" => export_contacts(&db).await,
            "6" => edit_sms_settings(&db).await,
            "7" => purge_sessions(&db).await,
            "8" => toggle_admin(&db).await,
            "0" => {
                println!("👋 Bye");
                break;
            }
            _ => {
                println!("❌ Invalid choice");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            println!("❌ {e:#}");
        }
    }

    db.close().await;
    Ok(())
}

fn print_menu() {
    println!();
    println!("╔════════════════════════════════════╗");
    println!("║        SPH CLI - Contacts          ║");
    println!("╠════════════════════════════════════╣");
    println!("║  1. Create User                    ║");
    println!("║  2. List Users                     ║");
    println!("║  3. Reset Password                 ║");
    println!("║  4. Show Counts                    ║");
    println!("║  5. Export Contacts (CSV)          ║");
    println!("║  6. SMS Provider Settings          ║");
    println!("║  7. Purge Expired Sessions         ║");
    println!("║  8. Grant/Revoke Admin             ║");
    println!("║  0. Exit                           ║");
    println!("╚════════════════════════════════════╝");
}

fn print_errors(errors: &FieldErrors) {
    for (field, messages) in errors.iter() {
        for message in messages {
            println!("  ⚠️  {field}: {message}");
        }
    }
}

async fn find_user(db: &SphDb) -> Result<User> {
    let username = read_line("Username: ")?;
    db.find_user(&username)
        .await?
        .ok_or_else(|| eyre!("No user named {username:?}"))
}

async fn create_user(db: &SphDb) -> Result<()> {
    let form = SignUpForm {
        username: read_line("Username: ")?,
        email: read_line("Email: ")?,
        password1: read_line("Password: ")?,
        password2: read_line("Password (again): ")?,
    };
    let input = match form.clean() {
        Ok(input) => input,
        Err(errors) => {
            print_errors(&errors);
            return Ok(());
        }
    };
    if db.find_user(&input.username).await?.is_some() {
        println!("❌ A user with that username already exists.");
        return Ok(());
    }

    let user = db
        .create_user(&input.username, &input.email, &input.password)
        .await?;
    tracing::info!(user_id = user.id, "User created from console");
    println!("✅ Created user: {} (id {})", user.username, user.id);
    Ok(())
}

async fn list_users(db: &SphDb) -> Result<()> {
    let users = db.list_users().await?;

    if users.is_empty() {
        println!("📭 No users found");
    } else {
        println!("\n📋 Users:");
        for user in users {
            let role = if user.is_admin { " [admin]" } else { "" };
            println!(
                "  {} {}{} - {} <{}>",
                user.id,
                user.username,
                role,
                user.display_name(),
                user.email
            );
        }
    }
    Ok(())
}

async fn reset_password(db: &SphDb) -> Result<()> {
    let user = find_user(db).await?;
    let password = read_line("New password: ")?;
    if password.chars().count() < 8 {
        println!("❌ Password must contain at least 8 characters.");
        return Ok(());
    }
    db.set_password(user.id, &password).await?;
    println!("🔑 Password updated for {}", user.username);
    Ok(())
}

async fn show_counts(db: &SphDb) -> Result<()> {
    let user = find_user(db).await?;
    let contacts = db.count_contacts(user.id).await?;
    let groups = db.count_groups(user.id).await?;
    let messages = db.list_sms(user.id).await?.len();
    println!(
        "📇 {}: {} contacts, {} groups, {} messages",
        user.username, contacts, groups, messages
    );
    Ok(())
}

async fn export_contacts(db: &SphDb) -> Result<()> {
    let user = find_user(db).await?;
    let path = read_line("Output file [contacts.csv]: ")?;
    let path = if path.is_empty() { "contacts.csv".to_string() } else { path };

    let contacts = db.list_contacts(user.id).await?;
    let file = File::create(&path).wrap_err_with(|| format!("Failed to create {path}"))?;
    let mut out = write_contacts_csv(BufWriter::new(file), contacts.iter().map(Contact::export_row))?;
    out.flush()?;

    println!("📤 Exported {} contacts to {}", contacts.len(), path);
    Ok(())
}

async fn edit_sms_settings(db: &SphDb) -> Result<()> {
    if let Some(current) = db.sms_settings().await? {
        println!("Current username: {}", current.user_name);
    }
    let form = SmsSettingsForm {
        user_name: read_line("Provider username: ")?,
        api_key: read_line("API key: ")?,
    };
    match form.clean() {
        Ok(input) => {
            db.save_sms_settings(&input).await?;
            println!("✅ SMS settings saved");
        }
        Err(errors) => print_errors(&errors),
    }
    Ok(())
}

/// Admins may edit the installation-wide SMS settings from the web UI.
async fn toggle_admin(db: &SphDb) -> Result<()> {
    let user = find_user(db).await?;
    let is_admin = !user.is_admin;
    db.set_admin(user.id, is_admin).await?;
    if is_admin {
        println!("🛡️  {} is now an admin", user.username);
    } else {
        println!("👤 {} is no longer an admin", user.username);
    }
    Ok(())
}

async fn purge_sessions(db: &SphDb) -> Result<()> {
    let purged = db.delete_expired_sessions(SESSION_TTL_SECS).await?;
    println!("🧹 Removed {purged} expired sessions");
    Ok(())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
