use std::{
    fs::File,
    io::{self, Read, Write},
};

use anyhow::Context;
use clap::{App, Arg};
use log::info;
use silly_front::{
    driver::Session,
    lexer::{byte_chars, Lexer},
    parser::Parser,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = App::new("silly")
        .version(env!("CARGO_PKG_VERSION"))
        .about("parse silly programs and report each top-level form")
        .arg(
            Arg::with_name("FILE")
                .help("source file to read, standard input if omitted")
                .index(1),
        )
        .arg(
            Arg::with_name("no-prompt")
                .long("no-prompt")
                .help("don't print the `ready>` prompt"),
        )
        .arg(
            Arg::with_name("dump-ast")
                .long("dump-ast")
                .help("print every parsed form to stdout"),
        )
        .get_matches();

    let input: Box<dyn Read> = match matches.value_of("FILE") {
        Some(path) => {
            info!("reading {}", path);
            Box::new(io::BufReader::new(
                File::open(path).with_context(|| format!("failed to open {}", path))?,
            ))
        }
        None => Box::new(io::stdin()),
    };

    let parser = Parser::new(Lexer::new(byte_chars(input)));
    let mut session =
        Session::new(parser, io::stderr()).with_prompt(!matches.is_present("no-prompt"));
    let dump_ast = matches.is_present("dump-ast");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut parsed = 0;
    while let Some(result) = session
        .next_form()
        .context("failed to write diagnostics")?
    {
        if let Ok(node) = result {
            parsed += 1;
            if dump_ast {
                writeln!(out, "{}", node)?;
            }
        }
    }

    info!("parsed {} top-level forms", parsed);
    Ok(())
}
