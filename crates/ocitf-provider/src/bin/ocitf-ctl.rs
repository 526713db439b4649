// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ocitf Control CLI
//!
//! Inspects the provider without talking to OCI: the registered types,
//! their schemas, the configuration read from the environment, and plans.
//!
//! Usage:
//!   ocitf-ctl <command> [options]
//!
//! Commands:
//!   resources                     List resource types
//!   data-sources                  List data source types
//!   schema <type>                 Print the schema of a type
//!   config                        Print the provider configuration
//!   plan <type> [--prior <json>] [--desired <json>]

use std::process::ExitCode;

use ocitf_core::logging::init_logging;
use ocitf_core::{ProviderConfig, ResourceState};
use ocitf_provider::provider_schema;
use serde_json::json;

fn print_usage() {
    eprintln!(
        r#"Usage: ocitf-ctl <command> [options]

Inspect the ocitf provider.

COMMANDS:
    resources                       List resource types
    data-sources                    List data source types
    schema <type>                   Print the schema of a resource or data source
    config                          Print the configuration read from the environment
    plan <type>                     Show the action applying a desired state needs

PLAN OPTIONS:
    --prior <json>                  Current state (omit for a new resource)
    --desired <json>                Desired state (omit to plan a delete)

ENVIRONMENT:
    TF_VAR_<name> / OCI_<NAME>      Provider settings (region, tenancy_ocid, ...)
    OCITF_LOG                       Log filter (default: info)

A .env file in the working directory is loaded first.

EXAMPLES:
    # Schema of the stream resource
    ocitf-ctl schema oci_streaming_stream

    # Does renaming a stream replace it?
    ocitf-ctl plan oci_streaming_stream \
        --prior '{{"id": "s1", "name": "a", "partitions": 1}}' \
        --desired '{{"id": "s1", "name": "b", "partitions": 1}}'
"#
    );
}

#[derive(Debug)]
enum Command {
    Resources,
    DataSources,
    Schema {
        type_name: String,
    },
    Config,
    Plan {
        type_name: String,
        prior: Option<String>,
        desired: Option<String>,
    },
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from_vec(&args)
}

fn parse_args_from_vec(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        "resources" => Ok(Command::Resources),
        "data-sources" => Ok(Command::DataSources),
        "schema" => {
            let type_name = args.get(2).ok_or("Type name required")?.clone();
            Ok(Command::Schema { type_name })
        }
        "config" => Ok(Command::Config),
        "plan" => {
            let type_name = args.get(2).ok_or("Type name required")?.clone();
            let mut prior: Option<String> = None;
            let mut desired: Option<String> = None;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--prior" => {
                        i += 1;
                        prior = Some(args.get(i).ok_or("--prior requires JSON")?.clone());
                    }
                    "--desired" => {
                        i += 1;
                        desired = Some(args.get(i).ok_or("--desired requires JSON")?.clone());
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Plan {
                type_name,
                prior,
                desired,
            })
        }
        cmd => Err(format!("Unknown command: {}", cmd)),
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_logging();

    let cmd = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match execute_command(cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_state(raw: Option<&str>) -> Result<Option<ResourceState>, String> {
    raw.map(|s| serde_json::from_str(s).map_err(|e| format!("Invalid state JSON: {}", e)))
        .transpose()
}

fn execute_command(cmd: Command) -> Result<(), String> {
    let schema = provider_schema();
    let output = match cmd {
        Command::Resources => json!(schema.resources.keys().collect::<Vec<_>>()),

        Command::DataSources => json!(schema.data_sources.keys().collect::<Vec<_>>()),

        Command::Schema { type_name } => {
            let spec = schema
                .resources
                .get(&type_name)
                .or_else(|| schema.data_sources.get(&type_name))
                .ok_or_else(|| format!("Unknown type: {}", type_name))?;
            serde_json::to_value(spec).map_err(|e| e.to_string())?
        }

        Command::Config => {
            let config = ProviderConfig::from_env().map_err(|e| e.to_string())?;
            let valid = config.validate().map_err(|e| e.to_string());
            json!({
                "config": config,
                "valid": valid.is_ok(),
                "error": valid.err(),
            })
        }

        Command::Plan {
            type_name,
            prior,
            desired,
        } => {
            let spec = schema
                .resources
                .get(&type_name)
                .ok_or_else(|| format!("Unknown resource type: {}", type_name))?;
            let prior = parse_state(prior.as_deref())?;
            let desired = parse_state(desired.as_deref())?;
            let plan = spec.plan(prior.as_ref(), desired.as_ref());
            serde_json::to_value(plan).map_err(|e| e.to_string())?
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_no_command() {
        let result = parse_args_from_vec(&args(&["ocitf-ctl"]));
        assert_eq!(result.unwrap_err(), "No command specified");
    }

    #[test]
    fn test_parse_unknown_command() {
        let result = parse_args_from_vec(&args(&["ocitf-ctl", "destroy"]));
        assert!(result.unwrap_err().contains("Unknown command: destroy"));
    }

    #[test]
    fn test_parse_schema() {
        match parse_args_from_vec(&args(&["ocitf-ctl", "schema", "oci_streaming_stream"])) {
            Ok(Command::Schema { type_name }) => assert_eq!(type_name, "oci_streaming_stream"),
            other => panic!("Expected Schema command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_schema_missing_type() {
        let result = parse_args_from_vec(&args(&["ocitf-ctl", "schema"]));
        assert!(result.unwrap_err().contains("Type name required"));
    }

    #[test]
    fn test_parse_plan_options() {
        let result = parse_args_from_vec(&args(&[
            "ocitf-ctl",
            "plan",
            "oci_logging_log_group",
            "--desired",
            "{}",
        ]));
        match result.unwrap() {
            Command::Plan {
                type_name,
                prior,
                desired,
            } => {
                assert_eq!(type_name, "oci_logging_log_group");
                assert!(prior.is_none());
                assert_eq!(desired.as_deref(), Some("{}"));
            }
            other => panic!("Expected Plan command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plan_unknown_arg() {
        let result = parse_args_from_vec(&args(&[
            "ocitf-ctl",
            "plan",
            "oci_logging_log_group",
            "--force",
        ]));
        assert!(result.unwrap_err().contains("Unknown argument: --force"));
    }

    #[test]
    fn test_execute_plan_replace_on_rename() {
        let cmd = Command::Plan {
            type_name: "oci_streaming_stream".to_string(),
            prior: Some(r#"{"id": "s1", "name": "a", "partitions": 1}"#.to_string()),
            desired: Some(r#"{"id": "s1", "name": "b", "partitions": 1}"#.to_string()),
        };
        assert!(execute_command(cmd).is_ok());
    }

    #[test]
    fn test_execute_schema_unknown_type() {
        let cmd = Command::Schema {
            type_name: "oci_nothing".to_string(),
        };
        assert_eq!(execute_command(cmd).unwrap_err(), "Unknown type: oci_nothing");
    }
}
