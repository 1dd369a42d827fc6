//! Command-line argument parsing and dispatch for `rzk`.

use crate::parser::{ModuleParser, StubParser};
use crate::project::{find_project_root, Manifest};
use clap::{Parser, Subcommand};
use log::debug;
use rzk_kernel::{check_module, Checker, Context, Declaration, DriverError};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rzk", about = "A type checker for a dependent type theory with cubes and topes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Type-check every file a project's manifest includes.
    Check {
        /// Project directory to check (defaults to the current directory
        /// or an ancestor containing `rzk.yaml`).
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Scaffold a new project.
    New {
        /// Directory to create.
        name: String,
    },
}

pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { project } => cmd_check(project),
        Commands::New { name } => cmd_new(&name),
    }
}

fn cmd_new(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let root = PathBuf::from(name);
    std::fs::create_dir_all(root.join("src"))?;
    let manifest = Manifest::new();
    std::fs::write(root.join("rzk.yaml"), manifest.to_yaml()?)?;
    std::fs::write(root.join("src/main.rzk"), "# new rzk project\n")?;
    println!("Created new project `{}`", name);
    Ok(())
}

fn cmd_check(project: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let start = match project {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    let root = find_project_root(&start)
        .ok_or_else(|| format!("no rzk.yaml found in {} or any ancestor directory", start.display()))?;
    let manifest = Manifest::load(&root)?;
    let files = manifest.resolve_files(&root)?;

    let parser = StubParser;
    let mut checker = Checker::new();
    let mut ctx = Context::new();
    let mut total = 0usize;
    for file in &files {
        debug!("checking file {}", file.display());
        let module = parser.parse_module_file(file)?;
        let decls: Vec<Declaration> = module.decls;
        total += decls.len();
        if let Err(e) = check_module(&mut checker, &mut ctx, &decls) {
            eprintln!("{}", context_dump(file, &e, &checker, &ctx));
            std::process::exit(1);
        }
    }
    println!("Everything is ok! ({} files, {} declarations)", files.len(), total);
    Ok(())
}

/// Renders the first error's full context: the offending file and
/// declaration, the pretty-printed error, and the active context — every
/// variable's known type, every solved hole, every local tope, and every
/// defined variable — so a failure is diagnosable without rerunning under
/// a debugger.
fn context_dump(file: &Path, error: &DriverError, checker: &Checker, ctx: &Context) -> String {
    let mut out = String::new();
    out.push_str(&format!("Error in {}, declaration `{}`: {}\n", file.display(), error.declaration, error.error));
    out.push_str("\ncontext at the point of failure:\n");

    out.push_str("  known types:\n");
    for (name, ty) in ctx.types() {
        out.push_str(&format!("    {} : {}\n", name, ty));
    }

    out.push_str("  hole solutions:\n");
    for (hole, solution) in checker.holes().known_solutions() {
        out.push_str(&format!("    {} := {}\n", hole, solution));
    }

    out.push_str("  local topes:\n");
    for tope in ctx.topes() {
        out.push_str(&format!("    {}\n", tope));
    }

    out.push_str("  defined variables:\n");
    for (name, body) in ctx.env() {
        out.push_str(&format!("    {} := {}\n", name, body));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rzk_kernel::Term;

    #[test]
    fn context_dump_reports_file_declaration_and_known_state() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        ctx.set_type("a".into(), Term::Universe);
        ctx.add_definition("b".into(), Term::Cube, Term::Cube2);
        let decls = vec![Declaration { name: "bad".into(), ty: Term::Cube, body: Term::Tope }];
        let err = check_module(&mut checker, &mut ctx, &decls).unwrap_err();
        let dump = context_dump(Path::new("src/bad.rzk"), &err, &checker, &ctx);
        assert!(dump.contains("src/bad.rzk"));
        assert!(dump.contains("declaration `bad`"));
        assert!(dump.contains("a : "));
        assert!(dump.contains("b := "));
    }
}
