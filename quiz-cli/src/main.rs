// Command-line interface for moodlemd
//
// Converts a quiz between the Moodle XML question export and the plain-text
// notation. The direction follows the input's extension: `.xml` becomes a
// `.md` file, `.md` or `.txt` becomes `.xml`.
//
// Usage:
//  moodlemd <input> [-o <output>] [--overwrite] [--no-sort] [--no-markdown]
//           [--save-images] [--download-images] [--config <path>]
//
// Settings come from the embedded defaults, then `moodlemd.toml` in the
// working directory, then `--config`, then the flags above. Nothing is
// written unless the whole conversion succeeds.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use quiz_babel::{FormatRegistry, FsAssets, TextFormat, XmlFormat};
use quiz_config::{Loader, QuizConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn build_cli() -> Command {
    Command::new("moodlemd")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert quizzes between Moodle XML and a plain-text notation")
        .long_about(
            "moodlemd converts a Moodle XML question export to an editable text file \
            and back.\n\n\
            The direction is taken from the input's extension:\n  \
            - .xml        -> .md  (text notation)\n  \
            - .md, .txt   -> .xml (Moodle import)\n\n\
            Examples:\n  \
            moodlemd quiz.md                      # Writes quiz.xml\n  \
            moodlemd export.xml -o quiz.md        # Writes quiz.md\n  \
            moodlemd export.xml --save-images     # Also writes attached images\n\n\
            Set RUST_LOG=debug to follow the conversion question by question.",
        )
        .arg_required_else_help(true)
        .arg(
            Arg::new("input")
                .help("Quiz to convert (.xml, .md or .txt)")
                .required(true)
                .index(1)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .help("Output file (defaults to the input with the other extension)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Replace an existing output file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-sort")
                .long("no-sort")
                .help("Keep questions in source order instead of sorting them by name")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-markdown")
                .long("no-markdown")
                .help("Keep imported bodies as plain text with inline HTML")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("save-images")
                .long("save-images")
                .help("Write images attached to the XML next to the output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("download-images")
                .long("download-images")
                .help("Download images referenced by URL")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a moodlemd.toml configuration file")
                .value_hint(ValueHint::FilePath),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = build_cli().get_matches();
    let config = load_cli_config(&matches);

    let input = matches
        .get_one::<String>("input")
        .expect("input is required");
    let output = matches.get_one::<String>("output").map(PathBuf::from);
    handle_convert_command(
        Path::new(input),
        output,
        matches.get_flag("overwrite"),
        &config,
    );
}

/// Defaults, then `moodlemd.toml`, then `--config`, then flags.
fn load_cli_config(matches: &ArgMatches) -> QuizConfig {
    let loader = Loader::new().with_optional_file("moodlemd.toml");
    let loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader,
    };

    let overrides = [
        ("no-sort", "text.sort_questions", false),
        ("no-markdown", "xml.markdown", false),
        ("save-images", "xml.save_images", true),
        ("download-images", "xml.download_images", true),
    ];
    let loader = overrides
        .into_iter()
        .filter(|(flag, _, _)| matches.get_flag(flag))
        .try_fold(loader, |loader, (_, key, value)| loader.set_override(key, value));

    loader.and_then(Loader::build).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Source format, target format and the target's default extension.
fn direction(registry: &FormatRegistry, input: &Path) -> Option<(String, &'static str, &'static str)> {
    let from = registry.detect_format_from_filename(&input.to_string_lossy())?;
    match from.as_str() {
        "xml" => Some((from, "text", "md")),
        "text" => Some((from, "xml", "xml")),
        _ => None,
    }
}

fn handle_convert_command(
    input: &Path,
    output: Option<PathBuf>,
    overwrite: bool,
    config: &QuizConfig,
) {
    let mut registry = FormatRegistry::new();
    registry.register(TextFormat::new(config.text_options()));
    registry.register(XmlFormat::new(config.xml_options()));

    let Some((from, to, extension)) = direction(&registry, input) else {
        eprintln!(
            "Error: cannot tell the format of '{}' (expected .xml, .md or .txt)",
            input.display()
        );
        std::process::exit(1);
    };
    let output = output.unwrap_or_else(|| input.with_extension(extension));
    if output.exists() && !overwrite {
        eprintln!(
            "Error: '{}' already exists, pass --overwrite to replace it",
            output.display()
        );
        std::process::exit(1);
    }

    let source = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {e}", input.display());
        std::process::exit(1);
    });

    let mut assets = FsAssets::new(parent_dir(input), parent_dir(&output));

    let quiz = registry.parse(&source, &from, &mut assets).unwrap_or_else(|e| {
        eprintln!("Error in '{}': {e}", input.display());
        std::process::exit(1);
    });
    let quiz = if config.text.sort_questions {
        quiz.sorted()
    } else {
        quiz
    };
    tracing::info!(questions = quiz.questions.len(), from = %from, to, "converted");

    let result = registry.serialize(&quiz, to, &mut assets).unwrap_or_else(|e| {
        eprintln!("Error in '{}': {e}", input.display());
        std::process::exit(1);
    });

    let attachments = assets.flush().unwrap_or_else(|e| {
        eprintln!("Error in '{}': {e}", input.display());
        std::process::exit(1);
    });
    if attachments > 0 {
        tracing::info!(attachments, "wrote attachments");
    }

    fs::write(&output, result).unwrap_or_else(|e| {
        eprintln!("Error writing file '{}': {e}", output.display());
        std::process::exit(1);
    });
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
