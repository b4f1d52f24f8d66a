// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for relForge.

use clap::Parser;

use relforge::assembler::cli::{cpusupport_report, run_with_config, validate_cli, Cli};

fn main() {
    let cli = Cli::parse();
    if cli.print_cpus {
        println!("{}", cpusupport_report());
        return;
    }
    let config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run_with_config(&config) {
        Ok(diagnostics) => {
            let mut failed = false;
            for diag in &diagnostics {
                eprintln!("{}", diag.message);
                failed = true;
            }
            if failed {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
