// Copyright 2022 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use clap::crate_authors;
use structopt::StructOpt;

use std::{
    fs,
    io::prelude::*,
    path::{Path, PathBuf},
};

use parsegen::console::{Console, Severity};
use parsegen::description::write_description;
use parsegen::language_stage::LanguageStage;
use parsegen::lexer_stage::LexerStage;
use parsegen::parser_stage::ParserStage;
use parsegen::spec_parser::parse_specification;

fn with_changed_extension(path: &Path, new_extension: &str) -> PathBuf {
    let mut new_path = PathBuf::new();
    if let Some(dir) = path.parent() {
        new_path.push(dir);
    };
    new_path.push(path.file_stem().unwrap());
    new_path.set_extension(new_extension);
    new_path
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "parsegen",
    about = "Lexer and LALR(1) Parser Table Generator",
    author = crate_authors!(),
)]
struct CLOptions {
    /// Overwrite the output files (if they exist)
    #[structopt(short, long)]
    force: bool,
    /// Report progress while compiling
    #[structopt(short, long)]
    verbose: bool,
    /// Suppress the warning for empty guards
    #[structopt(long)]
    allow_empty_guards: bool,
    /// The language to compile (defaults to the first one in the file)
    #[structopt(short, long)]
    language: Option<String>,
    /// The path of the file containing the language specification.
    #[structopt(parse(from_os_str))]
    specification: PathBuf,
}

fn main() {
    let cl_options = CLOptions::from_args();
    let output_path = with_changed_extension(&cl_options.specification, "description");
    if output_path.exists() && !cl_options.force {
        writeln!(
            std::io::stderr(),
            "{}: output file already exists",
            output_path.to_string_lossy()
        )
        .unwrap();
        std::process::exit(1);
    }

    let mut specification_text = String::new();
    let mut file = match fs::File::open(&cl_options.specification) {
        Ok(file) => file,
        Err(error) => {
            writeln!(
                std::io::stderr(),
                "Error opening specification file: {:?}",
                error
            )
            .unwrap();
            std::process::exit(2);
        }
    };
    if let Err(error) = file.read_to_string(&mut specification_text) {
        writeln!(
            std::io::stderr(),
            "Error reading specification file: {:?}",
            error
        )
        .unwrap();
        std::process::exit(2);
    };

    let filename = cl_options.specification.to_string_lossy().to_string();
    let definition_file = match parse_specification(&specification_text) {
        Ok(file) => file,
        Err(error) => {
            writeln!(std::io::stderr(), "{}: Parse failed: {}", filename, error).unwrap();
            std::process::exit(2);
        }
    };

    let mut console = Console::new();
    console.set_verbose(cl_options.verbose);
    if cl_options.allow_empty_guards {
        console.set_option("allow-empty-guards", "yes");
    }

    let language = match &cl_options.language {
        Some(name) => definition_file.language_with_name(name),
        None => definition_file.languages().next(),
    };
    let language = match language {
        Some(language) => language,
        None => {
            writeln!(std::io::stderr(), "{}: no language to compile", filename).unwrap();
            std::process::exit(2);
        }
    };

    let mut data = LanguageStage::compile(&mut console, &filename, &definition_file, language);
    if console.error_count() > 0 {
        writeln!(
            std::io::stderr(),
            "Too many errors: {}.",
            console.error_count()
        )
        .unwrap();
        std::process::exit(4);
    }

    let lexer_output = match LexerStage::compile(&mut console, &filename, &mut data) {
        Some(output) if console.error_count() == 0 => output,
        _ => {
            writeln!(
                std::io::stderr(),
                "Too many errors: {}.",
                console.error_count()
            )
            .unwrap();
            std::process::exit(4);
        }
    };

    let parser_output =
        match ParserStage::compile(&mut console, &filename, &mut data, &lexer_output.weak_symbols)
        {
            Some(output) if console.error_count() == 0 => output,
            _ => {
                writeln!(
                    std::io::stderr(),
                    "Unresolved conflicts or errors ({}) aborting",
                    console.error_count()
                )
                .unwrap();
                std::process::exit(5);
            }
        };

    let mut output = match fs::File::create(&output_path) {
        Ok(file) => file,
        Err(error) => {
            writeln!(std::io::stderr(), "Error creating output file: {:?}", error).unwrap();
            std::process::exit(2);
        }
    };
    if let Err(error) = write_description(&mut output, &data, &parser_output.builder) {
        writeln!(std::io::stderr(), "Error writing output file: {:?}", error).unwrap();
        std::process::exit(2);
    }

    console.report(
        Severity::Detail,
        &filename,
        "COMPILATION_COMPLETE",
        &format!(
            "{} parser states, {} reduce rules",
            parser_output.builder.count_states(),
            parser_output.tables.count_reduce_rules()
        ),
        dfa::Position::default(),
    );
}
