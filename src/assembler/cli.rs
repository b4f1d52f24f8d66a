// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and the assembly run driver.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};

use crate::cpu::{find_cpu, CPUS};

use super::{Assembler, Diagnostic, Syntax};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Relocatable macro assembler for the 6502 family \
(6502, 6502 + undocumented opcodes, 65C02, 65C02 WDC, 65816).

Sources assemble to a raw binary image (optionally prefixed with a 2 byte \
load address and/or length word) or, with --obj, to a relocatable object \
file that a later assembly links with incobj/import object.";

/// Words prepended to a binary export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BinaryPrefix {
    /// Raw image, no prefix.
    #[default]
    None,
    /// 2 byte little-endian load address.
    Load,
    /// 2 byte little-endian length.
    Length,
    /// Load address then length.
    Both,
}

#[derive(Parser, Debug)]
#[command(
    name = "relforge",
    version = VERSION,
    about = "6502 family macro assembler with sections, relocation and object file linking",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Source file to assemble.
    pub source: Option<PathBuf>,
    /// Output file; export append-names insert themselves before the
    /// extension when several binaries are produced.
    pub output: Option<PathBuf>,
    #[arg(
        long = "obj",
        value_name = "FILE",
        long_help = "Write a relocatable object file instead of a binary image."
    )]
    pub obj: Option<PathBuf>,
    #[arg(
        long = "sym",
        value_name = "FILE",
        long_help = "Write the symbol map as JSON."
    )]
    pub sym: Option<PathBuf>,
    #[arg(
        long = "cpu",
        value_name = "NAME",
        long_help = "Initial CPU (6502, 6502ill, 65C02, 65C02WDC, 65816). In-source cpu directives may override."
    )]
    pub cpu: Option<String>,
    #[arg(
        long = "merlin",
        action = ArgAction::SetTrue,
        long_help = "Accept the Merlin dialect instead of the default dialect."
    )]
    pub merlin: bool,
    #[arg(
        long = "endm",
        action = ArgAction::SetTrue,
        long_help = "Macros and repeats end with endm/endr directives instead of brace scoping."
    )]
    pub endm: bool,
    #[arg(
        long = "prefix",
        value_enum,
        default_value_t = BinaryPrefix::None,
        long_help = "Prepend a 2 byte load address and/or length word to binary output."
    )]
    pub prefix: BinaryPrefix,
    #[arg(
        short = 'i',
        long = "include",
        value_name = "DIR",
        action = ArgAction::Append,
        long_help = "Add a folder to the include file search path. May repeat."
    )]
    pub include: Vec<PathBuf>,
    #[arg(
        long = "print-cpus",
        action = ArgAction::SetTrue,
        long_help = "Print supported CPUs as JSON and exit."
    )]
    pub print_cpus: bool,
}

/// Validated run configuration.
pub struct CliConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub obj: Option<PathBuf>,
    pub sym: Option<PathBuf>,
    pub cpu: crate::cpu::CpuIndex,
    pub syntax: Syntax,
    pub endm: bool,
    pub prefix: BinaryPrefix,
    pub include: Vec<PathBuf>,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, String> {
    let source = cli
        .source
        .clone()
        .ok_or_else(|| "no source file given".to_string())?;
    let output = cli.output.clone().unwrap_or_else(|| {
        let mut out = source.clone();
        out.set_extension("prg");
        out
    });
    let cpu = match &cli.cpu {
        Some(name) => {
            find_cpu(name)
                .ok_or_else(|| format!("unsupported cpu: {name}"))?
                .cpu
        }
        None => crate::cpu::CpuIndex::Cpu6502,
    };
    Ok(CliConfig {
        source,
        output,
        obj: cli.obj.clone(),
        sym: cli.sym.clone(),
        cpu,
        syntax: if cli.merlin { Syntax::Merlin } else { Syntax::Sane },
        endm: cli.endm,
        prefix: cli.prefix,
        include: cli.include.clone(),
    })
}

/// Supported CPU names, machine readable.
pub fn cpusupport_report() -> String {
    let cpus: Vec<serde_json::Value> = CPUS
        .iter()
        .map(|details| {
            serde_json::json!({
                "name": details.name,
            })
        })
        .collect();
    serde_json::json!({ "cpus": cpus }).to_string()
}

fn symbol_map_json(asm: &Assembler) -> String {
    let symbols: Vec<serde_json::Value> = asm
        .map
        .iter()
        .map(|symbol| {
            serde_json::json!({
                "name": symbol.name,
                "value": symbol.value,
                "section": symbol.section,
                "local": symbol.local,
            })
        })
        .collect();
    serde_json::json!({ "symbols": symbols }).to_string()
}

fn output_for_append(base: &Path, append: &str) -> PathBuf {
    if append.is_empty() {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}.{append}");
    if let Some(ext) = base.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    base.with_file_name(name)
}

/// Assemble → link zero page → export, per the validated configuration.
/// Returns the diagnostics collected along the way.
pub fn run_with_config(config: &CliConfig) -> Result<Vec<Diagnostic>, String> {
    let source_text = fs::read_to_string(&config.source)
        .map_err(|err| format!("failed to read {}: {err}", config.source.display()))?;

    let mut asm = Assembler::with_syntax(config.syntax);
    asm.set_cpu(config.cpu);
    asm.end_macro_directive = config.endm;
    for dir in &config.include {
        asm.add_include_folder(&dir.to_string_lossy());
    }
    asm.export_base_name = config
        .output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let source_name = config.source.to_string_lossy().into_owned();
    asm.assemble(&source_text, &source_name, config.obj.is_some());

    if let Some(obj) = &config.obj {
        asm.write_object_file(&obj.to_string_lossy())
            .map_err(|err| format!("failed to write {}: {err}", obj.display()))?;
    } else if !asm.error_encountered {
        if let Err(err) = asm.link_zp() {
            asm.diagnostics.push(Diagnostic {
                message: format!("Error: {}", err.message()),
                fatal: true,
            });
            asm.error_encountered = true;
        } else {
            for append in asm.export_names() {
                let Some((image, _, load)) = asm.build_export(&append) else {
                    continue;
                };
                let mut bytes = Vec::with_capacity(image.len() + 4);
                match config.prefix {
                    BinaryPrefix::None => {}
                    BinaryPrefix::Load => {
                        bytes.extend_from_slice(&(load as u16).to_le_bytes())
                    }
                    BinaryPrefix::Length => {
                        bytes.extend_from_slice(&(image.len() as u16).to_le_bytes())
                    }
                    BinaryPrefix::Both => {
                        bytes.extend_from_slice(&(load as u16).to_le_bytes());
                        bytes.extend_from_slice(&(image.len() as u16).to_le_bytes());
                    }
                }
                bytes.extend_from_slice(&image);
                let path = output_for_append(&config.output, &append);
                fs::write(&path, bytes)
                    .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
            }
        }
    }

    if let Some(sym) = &config.sym {
        fs::write(sym, symbol_map_json(&asm))
            .map_err(|err| format!("failed to write {}: {err}", sym.display()))?;
    }

    Ok(asm.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::{output_for_append, validate_cli, BinaryPrefix, Cli};
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn defaults_derive_output_from_source() {
        let cli = Cli::parse_from(["relforge", "game.s"]);
        let config = validate_cli(&cli).unwrap();
        assert_eq!(config.output, Path::new("game.prg"));
        assert_eq!(config.prefix, BinaryPrefix::None);
        assert!(!config.endm);
    }

    #[test]
    fn unknown_cpu_is_rejected() {
        let cli = Cli::parse_from(["relforge", "game.s", "--cpu", "z80"]);
        assert!(validate_cli(&cli).is_err());
    }

    #[test]
    fn append_name_lands_before_the_extension() {
        assert_eq!(
            output_for_append(Path::new("out/game.prg"), "music"),
            Path::new("out/game.music.prg")
        );
        assert_eq!(
            output_for_append(Path::new("game.prg"), ""),
            Path::new("game.prg")
        );
    }

    #[test]
    fn cpusupport_report_lists_all_cpus() {
        let report = super::cpusupport_report();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        let cpus = value["cpus"].as_array().unwrap();
        assert_eq!(cpus.len(), 5);
        assert!(cpus.iter().any(|c| c["name"] == "65816"));
    }
}
