#![allow(clippy::module_inception)]
use crate::cli::cli::{Cli, Commands, ProfileCommand};
use crate::config::app_config::{
    load_file_config_with_path, save_file_config, Config, FileProfileConfig,
};
use crate::shelf::handlers::{AddOptions, EditOptions, ImportRecordOptions, Shelf};
use crate::tui;
use clap::Parser;
use std::path::PathBuf;

mod cli;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Profile(cmd) => handle_profile_commands(cmd),
        command => run_shelf_command(command, cli.path, cli.profile).await,
    }
}

async fn run_shelf_command(
    command: Commands,
    path: Option<PathBuf>,
    profile: Option<String>,
) -> anyhow::Result<()> {
    let config = Config::create(path, profile)?;
    let shelf = Shelf::create(&config);

    match command {
        Commands::Add {
            vendor,
            account,
            api_key,
            tag,
            fields,
            mark,
        } => {
            let opts = AddOptions {
                vendor,
                account,
                api_key,
                tag,
                fields,
                mark,
            };
            shelf.handle_add(opts).await?;
        }
        Commands::Edit {
            id,
            vendor,
            account,
            api_key,
            tag,
            fields,
            clear_fields,
            mark,
            unmark,
            set,
            pin,
            unpin,
        } => {
            let opts = EditOptions {
                id,
                vendor,
                account,
                api_key,
                tag,
                fields,
                clear_fields,
                mark,
                unmark,
                set,
                pin,
                unpin,
            };
            shelf.handle_edit(opts).await?;
        }
        Commands::List {
            search,
            sort,
            tag,
            json,
        } => {
            shelf.handle_list(search, sort, tag, json).await?;
        }
        Commands::Show { id, reveal } => {
            shelf.handle_show(&id, reveal).await?;
        }
        Commands::Get {
            id,
            no_copy,
            echo,
            ttl,
        } => {
            shelf.handle_get(&id, no_copy, ttl, echo).await?;
        }
        Commands::Rm { ids, yes } => {
            shelf.handle_rm(ids, yes).await?;
        }
        Commands::Import { file } => {
            shelf.handle_import(file).await?;
        }
        Commands::Export { ids, all, out } => {
            shelf.handle_export(ids, all, out).await?;
        }
        Commands::ImportRecord {
            file,
            list_fields,
            set,
            pin,
            vendor,
            account,
            api_key,
            tag,
        } => {
            let opts = ImportRecordOptions {
                file,
                list_fields,
                set,
                pin,
                vendor,
                account,
                api_key,
                tag,
            };
            shelf.handle_import_record(opts).await?;
        }
        Commands::Tags => {
            shelf.handle_tags().await?;
        }
        Commands::Tui => {
            tui::launch(&config, &shelf).await?;
        }
        Commands::Profile(cmd) => handle_profile_commands(cmd)?,
    }

    Ok(())
}

fn handle_profile_commands(cmd: ProfileCommand) -> anyhow::Result<()> {
    let (path, mut cfg) = load_file_config_with_path();
    let profiles = cfg.profiles.get_or_insert_with(Default::default);

    match cmd {
        ProfileCommand::List => {
            let default = cfg.default_profile.as_deref();
            if profiles.is_empty() {
                println!("No profiles defined.");
            } else {
                println!("Profiles:");
                for (name, p) in profiles.iter() {
                    if Some(name.as_str()) == default {
                        println!("  {name} -> {} (default)", p.store_path);
                    } else {
                        println!("  {name} -> {}", p.store_path);
                    }
                }
            }
            return Ok(());
        }
        ProfileCommand::Show { name } => {
            match profiles.get(&name) {
                Some(p) => println!("profile: {name}\n  store_path: {}", p.store_path),
                None => anyhow::bail!(
                    "profile \"{name}\" is not defined; run `keyshelf profile list` to see available profiles"
                ),
            }
            return Ok(());
        }
        ProfileCommand::Add {
            name,
            store,
            on_duplicate_override,
        } => {
            if profiles.contains_key(&name) && !on_duplicate_override {
                anyhow::bail!(
                    "profile \"{name}\" already exists; use --on-duplicate-override to update it"
                );
            }
            profiles.insert(
                name.clone(),
                FileProfileConfig {
                    store_path: store.clone(),
                },
            );
            println!("Profile \"{name}\" set to store_path: {store}");
        }
        ProfileCommand::Rm { name } => {
            if cfg.default_profile.as_deref() == Some(name.as_str()) {
                anyhow::bail!(
                    "cannot remove default profile \"{name}\"; run `keyshelf profile default --clear` or change default first"
                );
            }
            if profiles.remove(&name).is_some() {
                println!("Removed profile \"{name}\".");
            } else {
                anyhow::bail!("profile \"{name}\" is not defined; run `keyshelf profile list`.");
            }
        }
        ProfileCommand::Default { name, clear } => {
            if clear {
                cfg.default_profile = None;
                println!("Default profile cleared.");
            } else if let Some(name) = name {
                if profiles.contains_key(&name) {
                    cfg.default_profile = Some(name.clone());
                    println!("Default profile set to \"{name}\".");
                } else {
                    anyhow::bail!("profile \"{name}\" is not defined; run `keyshelf profile list`.");
                }
            } else {
                match cfg.default_profile.as_deref() {
                    Some(name) => println!("Default profile: {name}"),
                    None => println!("No default profile set."),
                }
                return Ok(());
            }
        }
    }

    save_file_config(&path, &cfg)?;
    Ok(())
}
