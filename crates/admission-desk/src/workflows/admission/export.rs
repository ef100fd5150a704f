use super::listing::ListingRow;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer flush failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv buffer was not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render listing rows as the CSV document offered for download from the
/// staff listing.
pub fn listing_to_csv(rows: &[ListingRow]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "reference",
        "candidate",
        "training",
        "status",
        "modified_at",
        "submitted_at",
    ])?;

    for row in rows {
        writer.write_record([
            row.reference.as_str(),
            row.candidate.as_str(),
            row.training.as_str(),
            row.status_label,
            &row.modified_at.to_rfc3339(),
            &row
                .submitted_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
        ])?;
    }

    let buffer = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(buffer)?)
}
