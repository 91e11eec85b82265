// main.rs
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use bids_explorer::api::{ErrorReport, IndexSummary, ListRequest, RecordPage};
use bids_explorer::{AppConfig, BidsIndex, CriteriaParser, IndexBuilder};

const HELP: &str = "\
commands:
  select <key=value ...>   keep matching rows (e.g. select subject=001-003 run=01,02)
  remove <key=value ...>   drop matching rows
  reset                    back to the full index
  list [offset]            print file rows
  errors                   print rejected files
  summary                  print the index summary as JSON
  json                     print the current rows as JSON
  quit                     exit";

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let config = AppConfig::load();
    init_logging(&config.logging.level);

    let mut builder = IndexBuilder::from_config(&config);
    if let Some(root) = std::env::args().nth(1) {
        builder = builder.with_root(root);
    }
    let full = builder.build().context("failed to build index")?;
    if full.root().is_none() {
        println!("No dataset root given: pass it as the first argument or set [paths] root in config.toml");
    }

    println!("--- BIDS explorer ---");
    println!("{}", full);
    full.log_error_summary();
    println!("type 'help' for commands, 'quit' to exit");

    let parser = CriteriaParser::new();
    let mut current = full.clone();
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let (command, args) = input.split_once(char::is_whitespace).unwrap_or((input, ""));

        match command {
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "select" | "remove" => {
                let result = parser.parse(args).and_then(|criteria| {
                    if command == "select" {
                        current.select(&criteria)
                    } else {
                        current.remove(&criteria)
                    }
                });
                match result {
                    Ok(next) => {
                        current = next;
                        println!("{}", current);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "reset" => {
                current = full.clone();
                println!("{}", current);
            }
            "list" => {
                let offset = args.trim().parse().unwrap_or(0);
                print_page(&current, &ListRequest::new(offset, config.display.list_limit));
            }
            "errors" => print_errors(&current),
            "summary" => println!("{}", serde_json::to_string_pretty(&IndexSummary::from_index(&current))?),
            "json" => println!("{}", current.to_json()?),
            other => println!("Unknown command '{}', type 'help'", other),
        }
    }

    Ok(())
}

fn print_page(index: &BidsIndex, request: &ListRequest) {
    let page = RecordPage::from_index(index, request);
    if page.rows.is_empty() {
        println!("(no rows)");
        return;
    }
    for (i, record) in page.rows.iter().enumerate() {
        println!("{:>5}  {:>12}  {}", page.offset + i, record.unique_id, record.filename.display());
    }
    if page.has_more {
        println!("... {} of {} rows shown, 'list {}' for more", page.rows.len(), page.total, page.offset + page.rows.len());
    }
}

fn print_errors(index: &BidsIndex) {
    let report = ErrorReport::from_index(index);
    if report.total == 0 {
        println!("No errors found");
        return;
    }
    for error in &report.rows {
        println!("[{}] {}", error.error_type, error.filename.display());
        // validation messages repeat the path on their first two lines
        let skip = if error.error_message.starts_with("Non-standardized") { 2 } else { 0 };
        for line in error.error_message.lines().skip(skip).filter(|l| !l.is_empty()) {
            println!("    {}", line);
        }
    }
    let types: Vec<String> = report.error_types.iter().map(ToString::to_string).collect();
    println!("{} errors, types: {}", report.total, types.join(", "));
}
