//! Souldoc CLI - builds documentation models for SOUL source code

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use souldoc_core::{GenerateError, GeneratorOptions, InputFile, SourceCodeModel};

mod logging;

#[derive(Parser)]
#[command(name = "souldoc")]
#[command(version = souldoc_core::VERSION)]
#[command(about = "Documentation model generator for SOUL", long_about = None)]
struct Cli {
    /// Log each generation phase to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the documentation model as JSON
    Model {
        /// Source files or directories to document
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Options file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print the table of contents as an indented tree
    Toc {
        /// Source files or directories to document
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Options file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Model {
            paths,
            config,
            output,
            pretty,
        } => {
            let model = build_model(&paths, config.as_deref())?;
            let json = if pretty {
                serde_json::to_string_pretty(&model)?
            } else {
                serde_json::to_string(&model)?
            };
            match output {
                Some(file) => std::fs::write(&file, json)
                    .with_context(|| format!("Failed to write '{}'", file.display()))?,
                None => println!("{json}"),
            }
        }

        Commands::Toc { paths, config } => {
            let model = build_model(&paths, config.as_deref())?;
            print!("{}", model.toc);
        }
    }

    Ok(())
}

fn build_model(paths: &[PathBuf], config: Option<&Path>) -> Result<SourceCodeModel> {
    let options = match config {
        Some(file) => GeneratorOptions::load(file)
            .with_context(|| format!("Failed to load options from '{}'", file.display()))?,
        None => GeneratorOptions::default(),
    };

    let inputs = read_inputs(paths, &options)?;
    if inputs.is_empty() {
        return Err(anyhow::anyhow!(
            "No {} files found",
            options.source_extension
        ));
    }
    tracing::debug!(files = inputs.len(), "read sources");

    match SourceCodeModel::generate(&inputs, &options) {
        Ok(model) => Ok(model),
        Err(GenerateError::Compile(diagnostics)) => {
            for message in diagnostics.messages() {
                eprintln!("{message}");
            }
            Err(anyhow::anyhow!(
                "{} error(s) found",
                diagnostics.error_count()
            ))
        }
        Err(error) => Err(error.into()),
    }
}

/// Read every source file named by `paths`, walking directories
///
/// Files found in a directory are named relative to it, so output does not
/// depend on where the tool was run from.
fn read_inputs(paths: &[PathBuf], options: &GeneratorOptions) -> Result<Vec<InputFile>> {
    let mut inputs = Vec::new();

    for path in paths {
        let files = if path.is_file() {
            vec![path.clone()]
        } else if path.is_dir() {
            let mut files = collect_source_files(path, options.bare_extension())?;
            files.sort();
            files
        } else {
            return Err(anyhow::anyhow!("Path '{}' does not exist", path.display()));
        };

        for file in files {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read '{}'", file.display()))?;
            inputs.push(InputFile::new(display_name(path, &file), content));
        }
    }

    Ok(inputs)
}

fn display_name(root: &Path, file: &Path) -> String {
    let relative = if root.is_dir() {
        file.strip_prefix(root).unwrap_or(file)
    } else {
        file.file_name().map_or(file, Path::new)
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Collect all source files in a directory
fn collect_source_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        } else if path.is_dir() {
            // Skip hidden directories and build output
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !name.starts_with('.') && name != "target" {
                    files.extend(collect_source_files(&path, extension)?);
                }
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_nested_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("filters")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::create_dir_all(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("a.soul"), "").unwrap();
        std::fs::write(dir.path().join("filters/b.soul"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join(".git/c.soul"), "").unwrap();
        std::fs::write(dir.path().join("target/d.soul"), "").unwrap();

        let inputs =
            read_inputs(&[dir.path().to_path_buf()], &GeneratorOptions::default()).unwrap();
        let names: Vec<_> = inputs.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["a.soul", "filters/b.soul"]);
    }

    #[test]
    fn single_file_uses_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Gain.soul");
        std::fs::write(&file, "processor Gain {}").unwrap();
        let inputs = read_inputs(&[file], &GeneratorOptions::default()).unwrap();
        assert_eq!(inputs[0].filename, "Gain.soul");
    }

    #[test]
    fn missing_path_is_an_error() {
        let result = read_inputs(
            &[PathBuf::from("/definitely/not/here")],
            &GeneratorOptions::default(),
        );
        assert!(result.is_err());
    }
}
