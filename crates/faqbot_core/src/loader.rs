use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{FaqError, Result};
use crate::model::FaqPair;

const REQUIRED_COLUMNS: [&str; 2] = ["Question", "Answer"];

/// Load FAQ pairs from a delimited file with a header row.
pub fn load_faq_csv(path: &Path, delimiter: u8) -> Result<Vec<FaqPair>> {
    let file = File::open(path)
        .map_err(|e| FaqError::DataLoad(format!("open {}: {e}", path.display())))?;
    let pairs = read_faq_pairs(file, delimiter)
        .map_err(|e| match e {
            FaqError::DataLoad(msg) => FaqError::DataLoad(format!("{}: {msg}", path.display())),
            other => other,
        })?;
    info!(path = %path.display(), rows = pairs.len(), "loaded FAQ table");
    Ok(pairs)
}

/// Parse FAQ pairs from any reader. Fields may be double-quoted to carry the
/// delimiter or newlines. Rows that cannot be parsed are skipped with a
/// warning; a missing header column or an I/O failure aborts the load.
pub fn read_faq_pairs<R: Read>(reader: R, delimiter: u8) -> Result<Vec<FaqPair>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(b'"')
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| FaqError::DataLoad(format!("read header: {e}")))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(FaqError::DataLoad(format!("missing column '{column}'")));
        }
    }

    let mut pairs = Vec::new();
    let mut skipped = 0usize;
    for row in rdr.deserialize::<FaqPair>() {
        match row {
            Ok(pair) => pairs.push(pair),
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                return Err(FaqError::DataLoad(format!("read row: {err}")));
            }
            Err(err) => {
                skipped += 1;
                let line = err.position().map(|p| p.line());
                warn!(?line, error = %err, "skipping malformed FAQ row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, kept = pairs.len(), "some FAQ rows were skipped");
    }
    Ok(pairs)
}
