use clap::{Arg, Command};
use std::io::{self, Write};

const REGIONS: [&str; 5] = ["Ñuñoa", "Peñalolén", "Concepción", "Valparaíso", "Ancud"];
const TYPES: [&str; 4] = ["robo", "hurto", "daño", "fraude"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Writes a synthetic incident table to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(Arg::new("delim").long("delim").default_value(","))
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .help("utf-8, utf-8-bom, windows-1252 or utf-16le")
                .default_value("utf-8"),
        )
        .get_matches();

    let rows: u64 = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let delim = matches
        .get_one::<String>("delim")
        .map(String::as_str)
        .unwrap_or(",");
    let encoding = matches
        .get_one::<String>("encoding")
        .map(String::as_str)
        .unwrap_or("utf-8");
    if !matches!(encoding, "utf-8" | "utf-8-bom" | "windows-1252" | "utf-16le") {
        anyhow::bail!("unknown encoding {encoding:?}");
    }

    let mut out = io::BufWriter::new(io::stdout().lock());
    match encoding {
        "utf-8-bom" => out.write_all(&[0xEF, 0xBB, 0xBF])?,
        "utf-16le" => out.write_all(&[0xFF, 0xFE])?,
        _ => {}
    }

    let header = ["id", "tipo", "región", "monto", "prioridad"].join(delim);
    write_line(&mut out, encoding, &header)?;

    // Very simple deterministic data, some priorities left blank
    for i in 0..rows {
        let i_usize = i as usize;
        let priority = if i % 5 == 0 { String::new() } else { (i % 3).to_string() };
        let fields = [
            format!("INC{i:08}"),
            TYPES[i_usize % TYPES.len()].to_owned(),
            REGIONS[i_usize % REGIONS.len()].to_owned(),
            format!("{}.{:02}", i * 7 % 1000, i % 100),
            priority,
        ];
        write_line(&mut out, encoding, &fields.join(delim))?;
        if i % 10_000 == 0 {
            out.flush()?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Writes one line plus `\n` in the requested encoding. The BOM is written once by the caller.
fn write_line(out: &mut impl Write, encoding: &str, line: &str) -> io::Result<()> {
    match encoding {
        "windows-1252" => {
            let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(line);
            out.write_all(&bytes)?;
            out.write_all(b"\n")
        }
        "utf-16le" => {
            for unit in line.encode_utf16().chain("\n".encode_utf16()) {
                out.write_all(&unit.to_le_bytes())?;
            }
            Ok(())
        }
        _ => {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")
        }
    }
}
