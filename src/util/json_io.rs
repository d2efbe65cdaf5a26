
use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Returns true if the path should be treated as gzip compressed
pub fn is_gzipped(filename: &Path) -> bool {
    filename.extension().unwrap_or_default() == "gz"
}

/// Opens a file for reading, transparently decompressing `.gz` files.
/// # Errors
/// * if the file does not open
pub fn open_input(filename: &Path) -> anyhow::Result<Box<dyn Read>> {
    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let fp: Box<dyn Read> = if is_gzipped(filename) {
        Box::new(flate2::read::MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(fp)
}

/// Creates a file for writing, gzip compressing if the path ends with `.gz`.
/// # Errors
/// * if the file cannot be created
pub fn create_output(filename: &Path) -> anyhow::Result<Box<dyn Write>> {
    let file = File::create(filename)
        .with_context(|| format!("Error while creating {filename:?}:"))?;
    let fp: Box<dyn Write> = if is_gzipped(filename) {
        Box::new(flate2::write::GzEncoder::new(file, flate2::Compression::best()))
    } else {
        Box::new(file)
    };
    Ok(fp)
}

/// Helper function that loads a file into some type, helpful generic
/// # Arguments
/// * `filename` - the file path to open and parse, optionally gzipped
/// # Errors
/// * if the file does not open properly
/// * if the deserialization throws errors
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> anyhow::Result<T> {
    let fp = open_input(filename)?;
    let result: T = serde_json::from_reader(fp)
        .with_context(|| format!("Error while deserializing {filename:?}:"))?;
    Ok(result)
}

/// This will save a generic serializable struct to JSON.
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - user provided path to write to, gzipped if it ends with `.gz`
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(create_output(out_filename)?);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_gz_round_trip() {
        let mut data: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        data.insert("cnv1".to_string(), vec![0.0, 1.5]);
        let filename = std::env::temp_dir().join(format!("tadsift_{}_json_io.json.gz", std::process::id()));
        save_json(&data, &filename).unwrap();

        // make sure it is actually compressed
        let mut raw = vec![];
        File::open(&filename).unwrap().read_to_end(&mut raw).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);

        let loaded: BTreeMap<String, Vec<f64>> = load_json(&filename).unwrap();
        assert_eq!(loaded, data);
        std::fs::remove_file(&filename).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let result: anyhow::Result<Vec<String>> = load_json(Path::new("test_data/does_not_exist.json"));
        assert!(result.is_err());
    }
}
