// Copyright (c) 2025 AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use finledger::{cli, commands, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let owner = matches
        .get_one::<String>("profile")
        .cloned()
        .unwrap_or_else(|| "default".to_string());

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("asset", sub)) => commands::assets::handle(&conn, &owner, sub)?,
        Some(("invest", sub)) => commands::invest::handle(&mut conn, &owner, sub)?,
        Some(("savings", sub)) => commands::savings::handle(&mut conn, &owner, sub)?,
        Some(("recurring", sub)) => commands::recurring::handle(&mut conn, &owner, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&mut conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
