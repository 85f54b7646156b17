use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use brine_fbs_compiler::{generator_for, CompilationContext, CompileOptions, FbsError};

#[derive(Parser, Debug)]
#[command(name = "bfbs")]
#[command(about = "Parse, resolve and check FlatBuffers schemas, then hand the AST to a generator", long_about = None)]
struct Cli {
    /// Input `.fbs` files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Prefix directory for all generated files
    #[arg(short, long = "outputdir", default_value = ".")]
    output_dir: PathBuf,

    /// Which generator to use
    #[arg(short, long, default_value = "json")]
    generator: String,

    /// Additional directory to search for included files (repeatable)
    #[arg(short = 'I', long = "include-dir")]
    include_dirs: Vec<PathBuf>,

    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str())),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn output_path(output_dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut out = output_dir.join(stem);
    out.set_extension(extension);
    out
}

fn run(cli: &Cli) -> Result<(), FbsError> {
    let generator = generator_for(&cli.generator)?;
    let options = CompileOptions {
        include_dirs: cli.include_dirs.clone(),
        ..CompileOptions::default()
    };
    let mut context = CompilationContext::from_options(options);

    fs::create_dir_all(&cli.output_dir).map_err(|e| FbsError::io(&cli.output_dir, e))?;

    for input in &cli.files {
        let schema = context.compile(input)?;
        let code = generator.generate(&schema)?;
        let out_path = output_path(&cli.output_dir, input, generator.file_extension());
        fs::write(&out_path, code).map_err(|e| FbsError::io(&out_path, e))?;
        debug!(generator = generator.name(), output = %out_path.display(), "wrote output");
        println!("Compiled {} → {}", input.display(), out_path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["bfbs", "a.fbs", "b.fbs"]).unwrap();
        assert_eq!(cli.files, vec![PathBuf::from("a.fbs"), PathBuf::from("b.fbs")]);
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert_eq!(cli.generator, "json");
        assert!(cli.include_dirs.is_empty());
    }

    #[test]
    fn test_cli_requires_files() {
        assert!(Cli::try_parse_from(["bfbs", "-g", "json"]).is_err());
    }

    #[test]
    fn test_output_path_uses_file_stem() {
        assert_eq!(
            output_path(Path::new("out"), Path::new("schemas/monster.fbs"), "json"),
            PathBuf::from("out/monster.json")
        );
    }

    #[test]
    fn test_run_writes_json_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("point.fbs");
        fs::write(&input, "struct Point { x: float; y: float; }").unwrap();
        let out_dir = dir.path().join("out");

        let args: Vec<OsString> = vec![
            "bfbs".into(),
            "-o".into(),
            out_dir.clone().into_os_string(),
            input.clone().into_os_string(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        run(&cli).unwrap();
        let json = fs::read_to_string(out_dir.join("point.json")).unwrap();
        assert!(json.contains("\"Point\""));

        let bad = dir.path().join("bad.fbs");
        fs::write(&bad, "table T { x: Missing; }").unwrap();
        let args: Vec<OsString> = vec!["bfbs".into(), bad.into_os_string()];
        let cli = Cli::try_parse_from(args).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().ends_with("Undefined type \"Missing\""));
    }
}
