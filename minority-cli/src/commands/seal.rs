use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use minority_seal::{Choice, SealService, SessionKey};

#[derive(Subcommand)]
pub enum SealCommands {
    /// Generate a session key for a room
    Key {
        /// Room ID
        room_id: String,
    },
    /// Seal a choice
    Encrypt {
        /// Room ID
        room_id: String,
        /// A or B
        choice: Choice,
        /// Session key for the room
        #[arg(short, long)]
        key: String,
    },
    /// Open a sealed choice
    Decrypt {
        /// Sealed choice
        ciphertext: String,
        /// Session key the choice was sealed with
        #[arg(short, long)]
        key: String,
    },
    /// Open several sealed choices at once
    Batch {
        /// Session key the choices were sealed with
        #[arg(short, long)]
        key: String,
        /// Sealed choices
        #[arg(required = true)]
        ciphertexts: Vec<String>,
    },
    /// Check that a payload looks like a sealed choice
    Validate {
        /// Sealed choice
        ciphertext: String,
        /// Room ID
        room_id: String,
    },
    /// Show size and preview of a payload
    Info {
        /// Sealed choice
        ciphertext: String,
    },
}

pub async fn handle_seal_command(cmd: SealCommands, service: &SealService) -> anyhow::Result<()> {
    match cmd {
        SealCommands::Key { room_id } => {
            let key = service.generate_session_key(&room_id).await?;
            println!("Session key for room '{}':", room_id);
            println!("{}", key);
        }

        SealCommands::Encrypt {
            room_id,
            choice,
            key,
        } => {
            let key = SessionKey::from(key);
            let sealed = service.encrypt_choice(choice, &room_id, &key).await?;
            println!("{}", sealed);
        }

        SealCommands::Decrypt { ciphertext, key } => {
            let key = SessionKey::from(key);
            let choice = service.decrypt_choice(&ciphertext, &key).await?;
            println!("Choice: {}", choice);
        }

        SealCommands::Batch { key, ciphertexts } => {
            let key = SessionKey::from(key);
            let batch = service.decrypt_all_choices(&ciphertexts, &key).await;

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["Player", "Result"]);

            for revealed in &batch.revealed {
                table.add_row(vec![revealed.player.clone(), revealed.choice.to_string()]);
            }
            for failure in &batch.failures {
                table.add_row(vec![
                    failure.player.clone(),
                    format!("entry {} failed: {}", failure.index, failure.reason),
                ]);
            }

            println!("{table}");
            println!(
                "Opened {} of {} sealed choices",
                batch.revealed.len(),
                batch.total()
            );
        }

        SealCommands::Validate {
            ciphertext,
            room_id,
        } => {
            let valid = service.validate_encrypted_data(&ciphertext, &room_id).await;
            println!("{}", if valid { "valid" } else { "invalid" });
        }

        SealCommands::Info { ciphertext } => {
            let info = service.get_encrypted_data_info(&ciphertext);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
