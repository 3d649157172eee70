//! vertex-prompt: inspect and render prompt templates, split ReAct responses
//!
//! Usage:
//!   vertex-prompt vars <file>                              List template variables
//!   vertex-prompt render <file> [--mode <m>] key=value...  Render a template
//!   vertex-prompt react <file>                             Split a ReAct response into blocks

use std::collections::HashMap;
use vertexai_preview::planners::{parse_react, PlanReActPlanner, Planner};
use vertexai_preview::prompts::{extract_variables, render, ValidationMode};
use vertexai_preview::Part;

fn main() {
    vertexai_preview::init_logging();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "vars" => cmd_vars(&args[2..]),
        "render" => cmd_render(&args[2..]),
        "react" => cmd_react(&args[2..]),
        "version" | "--version" | "-V" => cmd_version(),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"vertex-prompt - prompt template and ReAct tooling

USAGE:
    vertex-prompt <COMMAND> [OPTIONS]

COMMANDS:
    vars <file>                             List the variables a template uses
    render <file> [--mode <m>] key=value... Render a template (modes: strict, warn, loose, none)
    react <file>                            Split a ReAct model response into tagged blocks
    version                                 Show version information
    help                                    Show this help message

ENVIRONMENT:
    RUST_LOG                                Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!("vertex-prompt {}", env!("CARGO_PKG_VERSION"));
}

fn read_input(args: &[String]) -> String {
    let Some(path) = args.first() else {
        eprintln!("Error: missing <file> argument (use - for stdin)");
        std::process::exit(1);
    };
    let result = if path == "-" {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    };
    match result {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: cannot read {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_vars(args: &[String]) {
    let template = read_input(args);
    match extract_variables(&template) {
        Ok(vars) if vars.is_empty() => println!("(no variables)"),
        Ok(vars) => {
            for v in vars {
                println!("{v}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_render_args(args: &[String]) -> Result<(ValidationMode, HashMap<String, String>), String> {
    let mut mode = ValidationMode::Strict;
    let mut vars = HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--mode" {
            let raw = iter.next().ok_or("--mode needs a value")?;
            mode = raw.parse().map_err(|e| format!("{e}"))?;
        } else if let Some((k, v)) = arg.split_once('=') {
            vars.insert(k.to_string(), v.to_string());
        } else {
            return Err(format!("expected key=value, got '{arg}'"));
        }
    }
    Ok((mode, vars))
}

fn cmd_render(args: &[String]) {
    let template = read_input(args);
    let (mode, vars) = match parse_render_args(args.get(1..).unwrap_or_default()) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    match render(&template, &vars, mode) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_react(args: &[String]) {
    let text = read_input(args);
    for segment in parse_react(&text) {
        println!("[{:?}]", segment.kind);
        println!("{}", segment.text);
        println!();
    }
    let planner = PlanReActPlanner::new();
    if let Some(parts) = planner.process_planning_response(&[Part::text(text)]) {
        let answer: Vec<&str> = parts
            .iter()
            .filter(|p| !p.is_thought())
            .filter_map(|p| p.text.as_deref())
            .collect();
        if !answer.is_empty() {
            println!("=== Answer ===");
            println!("{}", answer.join("").trim());
        }
    }
}
