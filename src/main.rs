//! basfile - inspect files written by legacy BASIC programs.

use anyhow::{Context, Result};
use basic_fileio::convert::latin1_encode;
use basic_fileio::format::write_literal;
use basic_fileio::{BasicFile, FileHandleFactory, FileIoError, OpenAccess, OpenMode, Value};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

fn cli() -> Command {
    let file_arg = || {
        Arg::new("file")
            .help("Path to the file to read")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .index(1)
    };

    Command::new("basfile")
        .version(basic_fileio::VERSION)
        .about("Inspect files written by legacy BASIC file statements")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("tokens")
                .about("Read every Input field and show the type it parses as")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("lines")
                .about("Read the file with LineInput, one numbered line at a time")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("records")
                .about("Hex dump the records of a Random file")
                .arg(file_arg())
                .arg(
                    Arg::new("length")
                        .long("length")
                        .short('l')
                        .help("Record length in bytes")
                        .required(true)
                        .value_parser(value_parser!(i32).range(1..=32767)),
                )
                .arg(
                    Arg::new("record")
                        .long("record")
                        .short('r')
                        .help("Dump only this 1-based record")
                        .value_parser(value_parser!(i64).range(1..)),
                ),
        )
}

fn file_path(matches: &ArgMatches) -> Result<&PathBuf> {
    matches
        .get_one::<PathBuf>("file")
        .context("file argument is required")
}

fn open(matches: &ArgMatches, mode: OpenMode, record_length: i32) -> Result<Box<dyn BasicFile>> {
    let path = file_path(matches)?;
    FileHandleFactory::new()
        .open(path, mode, Some(OpenAccess::Read), record_length)
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn show_tokens(matches: &ArgMatches) -> Result<()> {
    let mut file = open(matches, OpenMode::Input, -1)?;
    while !file.is_end_of_file()? {
        let mut value = Value::Empty;
        match file.input(&mut value) {
            Ok(()) => println!("{:<8} {}", value.type_name(), write_literal(&value)?),
            // trailing blanks after the last field
            Err(FileIoError::EndOfFile) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn show_lines(matches: &ArgMatches) -> Result<()> {
    let mut file = open(matches, OpenMode::Input, -1)?;
    let mut number = 0;
    while !file.is_end_of_file()? {
        number += 1;
        println!("{number:>6}  {}", file.line_input()?);
    }
    Ok(())
}

fn hex_dump_line(record: i64, bytes: &[u8]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let text: String = bytes
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { '.' })
        .collect();
    format!("{record:>6}: {}  |{text}|", hex.join(" "))
}

fn show_records(matches: &ArgMatches) -> Result<()> {
    let record_length = *matches
        .get_one::<i32>("length")
        .context("length argument is required")?;
    let mut file = open(matches, OpenMode::Random, record_length)?;

    let records = match matches.get_one::<i64>("record") {
        Some(&record) => record..=record,
        None => {
            let length = file.length()?;
            let count = length.div_ceil(record_length as u64) as i64;
            1..=count
        }
    };

    for record in records {
        let text = file.get_fixed_string(record_length as usize, record)?;
        println!("{}", hex_dump_line(record, &latin1_encode(&text)));
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging; RUST_LOG=debug shows handle lifecycle
    env_logger::init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("tokens", sub)) => show_tokens(sub),
        Some(("lines", sub)) => show_lines(sub),
        Some(("records", sub)) => show_records(sub),
        _ => unreachable!("subcommand_required is set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!basic_fileio::VERSION.is_empty());
    }

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
        let matches = cli()
            .try_get_matches_from(["basfile", "records", "data.dat", "--length", "16"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "records");
        assert_eq!(*sub.get_one::<i32>("length").unwrap(), 16);
        assert!(sub.get_one::<i64>("record").is_none());

        assert!(cli()
            .try_get_matches_from(["basfile", "records", "data.dat", "--length", "0"])
            .is_err());
    }

    #[test]
    fn test_hex_dump_line() {
        assert_eq!(
            hex_dump_line(2, &[0x41, 0x00, 0x7f, 0x20]),
            "     2: 41 00 7f 20  |A.. |"
        );
    }
}
