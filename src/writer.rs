use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::product::Product;

/// A record that can be laid out under a named header.
pub trait Row {
    fn cell(&self, column: &str) -> Option<String>;
}

impl Row for Product {
    fn cell(&self, column: &str) -> Option<String> {
        Some(match column {
            "title" => self.title.clone(),
            "description" => self.description.clone(),
            // Debug keeps the trailing ".0" on whole prices.
            "price" => format!("{:?}", self.price),
            "rating" => self.rating.to_string(),
            "num_of_reviews" => self.num_of_reviews.to_string(),
            _ => return None,
        })
    }
}

/// Writes one delimited file per category under `out_dir`.
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    out_dir: PathBuf,
    extension: String,
    delimiter: u8,
}

impl CatalogWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            extension: "csv".to_string(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        if delimiter == b'\t' {
            self.extension = "tsv".to_string();
        }
        self
    }

    pub fn path_for(&self, category: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", category, self.extension))
    }

    /// Write header + rows to `path`. The file only appears once it is complete.
    pub fn write<R: Row>(
        &self,
        path: &Path,
        header: &[String],
        records: &[R],
    ) -> Result<(), ScrapeError> {
        // Lay out every row first so a bad column never leaves a file behind.
        let rows = records
            .iter()
            .map(|r| {
                header
                    .iter()
                    .map(|col| r.cell(col).ok_or_else(|| ScrapeError::UnknownColumn(col.clone())))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| ScrapeError::io_write(&dir, e))?;

        let tmp = temp_path(path);
        if let Err(e) = self.write_rows(&tmp, header, &rows) {
            let _ = fs::remove_file(&tmp);
            return Err(ScrapeError::io_write(path, e));
        }
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ScrapeError::io_write(path, e)
        })?;

        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn write_rows(&self, tmp: &Path, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
        debug!("Writing {}", tmp.display());
        let file = fs::File::create(tmp)?;
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(&file);
        wtr.write_record(header)?;
        for row in rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        drop(wtr);
        file.sync_all()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::product_header;

    fn product(title: &str, price: f64, rating: u32, reviews: u32) -> Product {
        Product {
            title: title.into(),
            description: "d".into(),
            price,
            rating,
            num_of_reviews: reviews,
        }
    }

    fn read_back(path: &Path) -> Vec<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        rdr.records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn round_trip_single_record() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let path = writer.path_for("home");

        writer
            .write(&path, &product_header(), &[product("A", 1.0, 3, 5)])
            .unwrap();

        let rows = read_back(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ["title", "description", "price", "rating", "num_of_reviews"]);
        assert_eq!(rows[1], ["A", "d", "1.0", "3", "5"]);
    }

    #[test]
    fn header_order_drives_columns() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let path = writer.path_for("phones");
        let header = vec!["price".to_string(), "title".to_string()];

        writer
            .write(&path, &header, &[product("Nokia", 24.99, 0, 1)])
            .unwrap();

        assert_eq!(read_back(&path)[1], ["24.99", "Nokia"]);
    }

    #[test]
    fn quotes_delimiters_in_text() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let path = writer.path_for("laptops");
        let mut p = product("Asus", 295.99, 2, 4);
        p.description = "14\", Celeron N3350, 4GB".into();

        writer.write(&path, &product_header(), &[p]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"14\"\", Celeron N3350, 4GB\""));
        assert_eq!(read_back(&path)[1][1], "14\", Celeron N3350, 4GB");
    }

    #[test]
    fn empty_catalog_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let path = writer.path_for("touch");

        writer.write::<Product>(&path, &product_header(), &[]).unwrap();
        assert_eq!(read_back(&path).len(), 1);
    }

    #[test]
    fn overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let path = writer.path_for("home");

        let many = vec![product("A", 1.0, 1, 1), product("B", 2.0, 2, 2)];
        writer.write(&path, &product_header(), &many).unwrap();
        writer
            .write(&path, &product_header(), &[product("C", 3.0, 3, 3)])
            .unwrap();

        let rows = read_back(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "C");
    }

    #[test]
    fn unknown_column_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path());
        let path = writer.path_for("home");
        let header = vec!["title".to_string(), "sku".to_string()];

        let err = writer
            .write(&path, &header, &[product("A", 1.0, 1, 1)])
            .unwrap_err();
        assert!(matches!(err, ScrapeError::UnknownColumn(ref c) if c == "sku"));
        assert!(!path.exists());
    }

    #[test]
    fn tab_delimiter_uses_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CatalogWriter::new(dir.path()).with_delimiter(b'\t');
        let path = writer.path_for("tablets");
        assert!(path.ends_with("tablets.tsv"));

        writer
            .write(&path, &product_header(), &[product("iPad", 603.99, 4, 9)])
            .unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("title\tdescription\tprice"));
    }

    #[test]
    fn unwritable_target_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "not a directory").unwrap();
        let writer = CatalogWriter::new(&blocker);
        let path = writer.path_for("home");

        let err = writer
            .write(&path, &product_header(), &[product("A", 1.0, 1, 1)])
            .unwrap_err();
        assert!(matches!(err, ScrapeError::IoWrite { .. }));
    }
}
