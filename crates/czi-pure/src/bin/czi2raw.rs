use clap::Parser;
use czi_pure::cli::{init_logging, Destination, ExtractArgs};
use czi_pure::{extract, list_groups, CziReader, GroupHeader, RawFileSink, StreamSink};
use std::io::{self, BufWriter};
use std::process;

fn format_listing(groups: &[GroupHeader]) -> String {
    let mut out = String::new();
    for group in groups {
        out.push_str(&format!(
            "{}\t{}x{}x{}\t{}\t{}\n",
            group.name,
            group.extent[0],
            group.extent[1],
            group.extent[2],
            group.pixel_type,
            group.byte_len
        ));
    }
    out
}

fn run(args: &ExtractArgs) -> Result<String, String> {
    let path = args.input.display();
    let mut reader =
        CziReader::open(&args.input).map_err(|e| format!("Error reading '{}': {}", path, e))?;
    let options = args.options();

    if args.list {
        let groups = list_groups(&reader, &options)
            .map_err(|e| format!("Error parsing '{}': {}", path, e))?;
        return Ok(format_listing(&groups));
    }

    let summary = match args.destination() {
        Destination::Stdout => {
            let stdout = io::stdout();
            let mut sink = StreamSink::new(BufWriter::new(stdout.lock()));
            extract(&mut reader, &options, &mut sink)
        }
        Destination::Files(prefix) => {
            let mut sink = RawFileSink::new(prefix).with_meta(!args.no_meta);
            extract(&mut reader, &options, &mut sink)
        }
    }
    .map_err(|e| format!("Error extracting '{}': {}", path, e))?;

    let mut report = format!("{} of {} groups written", summary.written, summary.groups);
    if summary.filtered > 0 {
        report.push_str(&format!(", {} filtered", summary.filtered));
    }
    if summary.skipped > 0 {
        report.push_str(&format!(", {} skipped", summary.skipped));
    }
    tracing::info!("{}", report);
    Ok(String::new())
}

fn main() {
    let args = ExtractArgs::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}
