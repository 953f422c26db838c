/// Render dataset pre-processing entry point
mod archive;
mod camera;
mod converter;
mod exclusion;
mod filesystem;
mod filter;
mod manifest;
mod metadata;
mod occupancy;

use constants::{DEFAULT_JOBS, DEFAULT_RESOLUTION, FOOD_OCCUPANCY_THRESH, PLANTS_OCCUPANCY_THRESH};
use converter::DatasetConverter;
use filter::ModelFilter;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("filter") => run_filter(&args[2..]),
        Some("convert") => run_convert(&args[2..]),
        _ => {
            print_usage(&args[0]);
            process::exit(1);
        }
    }
}

fn run_filter(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut positional: Vec<&String> = Vec::new();
    let mut exclusion_list: Option<PathBuf> = None;
    let mut jobs = DEFAULT_JOBS;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--exclude" => {
                let value = iter.next().ok_or("--exclude requires a file path")?;
                exclusion_list = Some(PathBuf::from(value));
            }
            "--jobs" => {
                jobs = iter.next().ok_or("--jobs requires a number")?.parse()?;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown filter option: {flag}").into());
            }
            _ => positional.push(arg),
        }
    }

    if positional.len() != 3 {
        return Err("filter expects <src> <dst> <occupancy-thresh>".into());
    }

    let threshold: f64 = positional[2].parse()?;
    ModelFilter::new(
        Path::new(positional[0]),
        Path::new(positional[1]),
        threshold,
        exclusion_list.as_deref(),
        jobs,
    )?
    .run()
}

fn run_convert(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut positional: Vec<&String> = Vec::new();
    let mut resolution = DEFAULT_RESOLUTION;
    let mut jobs = DEFAULT_JOBS;
    let mut pack_archive = false;
    let mut keep_roll = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--resolution" => {
                resolution = iter.next().ok_or("--resolution requires a number")?.parse()?;
            }
            "--jobs" => {
                jobs = iter.next().ok_or("--jobs requires a number")?.parse()?;
            }
            "--zip" => pack_archive = true,
            "--keep-roll" => keep_roll = true,
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown convert option: {flag}").into());
            }
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        return Err("convert expects <src> <dst>".into());
    }

    DatasetConverter::new(
        Path::new(positional[0]),
        Path::new(positional[1]),
        resolution,
        jobs,
        pack_archive,
        keep_roll,
    )?
    .run()
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  filter <src> <dst> <occupancy-thresh> [--exclude <file>] [--jobs N]");
    eprintln!("      Drop models whose mean foreground occupancy falls below the");
    eprintln!(
        "      threshold ({PLANTS_OCCUPANCY_THRESH} for plant collections, \
         {FOOD_OCCUPANCY_THRESH} for food)."
    );
    eprintln!("  convert <src> <dst> [--resolution N] [--jobs N] [--zip] [--keep-roll]");
    eprintln!(
        "      Flatten and resize the filtered views (default {DEFAULT_RESOLUTION}px),"
    );
    eprintln!("      extract camera angles and write dataset.json; --zip packs the");
    eprintln!("      result into a single uncompressed archive.");
}
