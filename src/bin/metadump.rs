use argh::FromArgs;

use metadata_parser::*;

/** metadump v0.1.0
Author: Adrian <adrian.eddy@gmail.com>

Extract Exif metadata from image files and dump all tags
*/
#[derive(FromArgs)]
struct Opts {
    /// input file (JPEG with an Exif segment, or a raw TIFF/Exif block)
    #[argh(positional)]
    input: String,

    /// output as json
    #[argh(switch, short = 'j')]
    json: bool,

    /// print errors only
    #[argh(switch, short = 'e')]
    errors: bool,
}

fn main() {
    let opts: Opts = argh::from_env();

    let buf = std::fs::read(&opts.input).unwrap();

    let start = if buf.starts_with(b"II") || buf.starts_with(b"MM") {
        0
    } else {
        match util::find_exif_block(&buf) {
            Some(pos) => pos,
            None => {
                eprintln!("No Exif block found in {}", opts.input);
                std::process::exit(1);
            }
        }
    };

    match exif::parse(&buf[start..]) {
        Ok(md) => {
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&md).unwrap());
                return;
            }
            for dir in md.directories() {
                if !opts.errors {
                    for tag in dir.tags() {
                        println!("{: <25} 0x{:04x}: {}", format!("{}", dir.kind()), tag.id, tag.value.to_string());
                    }
                }
                for (id, msg) in dir.errors() {
                    match id {
                        Some(id) => println!("{: <25} error (0x{id:04x}): {msg}", format!("{}", dir.kind())),
                        None     => println!("{: <25} error: {msg}", format!("{}", dir.kind())),
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("Failed to parse {}: {e}", opts.input);
            std::process::exit(1);
        }
    }
}
