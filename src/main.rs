//! Thin CLI layer over `net-core`: parse args, styled output, exercise
//! `url_open`/`url_read`/`json_request`/`configure_auth`.

use std::collections::HashMap;
use std::io::IsTerminal;

use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use net_core::{AuthMethod, Method, RequestOptions};

fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var("NO_COLOR").unwrap_or_default().is_empty()
}

#[allow(dead_code)]
fn success(msg: &str) {
    if use_color() {
        println!("{}", msg.green());
    } else {
        println!("{msg}");
    }
}

fn error(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{msg}");
    }
}

fn info(msg: &str) {
    if use_color() {
        println!("{}", msg.cyan());
    } else {
        println!("{msg}");
    }
}

fn dim(msg: &str) {
    if use_color() {
        println!("{}", msg.dimmed());
    } else {
        println!("{msg}");
    }
}

fn parse_auth_method(s: &str) -> Option<AuthMethod> {
    match s {
        "none" => Some(AuthMethod::None),
        "cookie" => Some(AuthMethod::Cookie),
        "oauth" => Some(AuthMethod::OAuth),
        _ => None,
    }
}

fn run() -> Result<(), String> {
    let auth_arg = Arg::new("auth")
        .long("auth")
        .value_parser(["none", "cookie", "oauth"])
        .help("Authenticator to use for this request's host");

    let matches = Command::new("net-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Exercises net-core's retrying, authenticated HTTP client")
        .subcommand(
            Command::new("get")
                .about("GET a URL and print the response body")
                .arg(Arg::new("url").required(true))
                .arg(auth_arg.clone())
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Print response headers too"),
                ),
        )
        .subcommand(
            Command::new("json")
                .about("POST a JSON body and print the JSON response")
                .arg(Arg::new("url").required(true))
                .arg(Arg::new("body").long("body").help("Inline JSON body"))
                .arg(auth_arg.clone()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("get", sub_m)) => {
            let url = sub_m.get_one::<String>("url").unwrap();
            let verbose = sub_m.get_flag("verbose");
            if let Some(method) = sub_m.get_one::<String>("auth").and_then(|s| parse_auth_method(s)) {
                net_core::configure_auth(Some(method), HashMap::new(), None);
            }

            let bytes = net_core::url_read(url, RequestOptions::default())
                .ok_or_else(|| format!("request to {url} failed after retries"))?;
            if verbose {
                info(&format!("fetched {} bytes from {url}", bytes.len()));
            }
            println!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
        Some(("json", sub_m)) => {
            let url = sub_m.get_one::<String>("url").unwrap();
            if let Some(method) = sub_m.get_one::<String>("auth").and_then(|s| parse_auth_method(s)) {
                net_core::configure_auth(Some(method), HashMap::new(), None);
            }
            let body = sub_m
                .get_one::<String>("body")
                .map(|raw| serde_json::from_str(raw).map_err(|e| format!("invalid --body JSON: {e}")))
                .transpose()?;

            let method = if body.is_some() { Method::Post } else { Method::Get };
            let response = net_core::json_request(url, method, body, RequestOptions::default())
                .ok_or_else(|| format!("request to {url} failed after retries"))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string())
            );
            Ok(())
        }
        _ => {
            if use_color() {
                println!("{}", "net-cli".bright_cyan().bold());
            } else {
                println!("net-cli");
            }
            dim("Run `net-cli --help` for details.");
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();
    if !use_color() {
        colored::control::set_override(false);
    }

    let code = match std::panic::catch_unwind(run) {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error(&e);
            1
        }
        Err(_) => {
            error("An unexpected error occurred.");
            1
        }
    };
    std::process::exit(code);
}
