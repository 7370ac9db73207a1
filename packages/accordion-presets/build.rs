use std::env;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

fn main() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
    let dest_path = Path::new(&out_dir).join("presets.rs");
    let scores_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scores");

    let mut entries: Vec<_> = WalkDir::new(&scores_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "musicxml"))
        .collect();
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let mut code = String::new();
    code.push_str("/// Embedded preset scores as (name, MusicXML)\n");
    code.push_str("pub static PRESETS: &[(&str, &str)] = &[\n");

    for entry in entries {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(&scores_dir) else {
            continue;
        };
        let name = relative.with_extension("").to_string_lossy().replace('\\', "/");
        code.push_str(&format!(
            "    ({:?}, include_str!({:?})),\n",
            name,
            path.to_string_lossy()
        ));
    }

    code.push_str("];\n");
    fs::write(&dest_path, code)?;

    println!("cargo:rerun-if-changed=scores");
    Ok(())
}
