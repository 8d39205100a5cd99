// /proc/net/dev stats backend
//
// The file is a fixed-width text table with a two-line header. Column order
// has changed between kernel versions, so the byte counter columns are found
// by name from the header once, when the file is opened.

use crate::backends::BackendPriority;
use crate::backends::stats::{CounterSample, StatsSource};
use crate::error::{MonitorError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const PROC_NET_DEV: &str = "/proc/net/dev";
const SEPARATORS: &[char] = &[' ', ':', '\t', '|'];

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(SEPARATORS).filter(|token| !token.is_empty())
}

/// Token positions of the rx and tx byte counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    rx: usize,
    tx: usize,
}

impl ColumnMap {
    /// Map the header line's columns; receive comes before transmit
    pub fn from_header(line: &str) -> Option<Self> {
        let mut bytes_columns = tokens(line)
            .enumerate()
            .filter(|(_, token)| *token == "bytes")
            .map(|(index, _)| index);

        let rx = bytes_columns.next()?;
        let tx = bytes_columns.next()?;
        Some(Self { rx, tx })
    }

    /// Find the header line and map it
    ///
    /// Only the first line mentioning "bytes" is considered.
    fn discover<R: BufRead>(reader: &mut R) -> std::io::Result<Option<Self>> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if line.contains("bytes") {
                return Ok(Self::from_header(&line));
            }
        }
    }

    /// Counters from a data line, if it belongs to `interface`
    pub fn parse_row(&self, line: &str, interface: &str) -> Option<CounterSample> {
        let mut fields = tokens(line);
        if fields.next()? != interface {
            return None;
        }

        let mut rx = None;
        let mut tx = None;
        for (index, token) in fields.enumerate() {
            // index 0 here is token 1 of the line
            let column = index + 1;
            if column == self.rx {
                rx = token.parse().ok();
            } else if column == self.tx {
                tx = token.parse().ok();
            }
            if column >= self.rx && column >= self.tx {
                break;
            }
        }

        Some(CounterSample::new(rx?, tx?))
    }
}

/// Stats backend reading a held-open /proc/net/dev
pub struct NetDevStats {
    path: PathBuf,
    reader: BufReader<File>,
    columns: ColumnMap,
}

impl NetDevStats {
    pub fn open() -> Result<Self> {
        Self::open_path(PROC_NET_DEV)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            MonitorError::unavailable("netdev", format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut reader = BufReader::new(file);

        // Without both byte columns this kernel has no counters for us, and
        // that is not going to change while we run
        let columns = ColumnMap::discover(&mut reader)?.ok_or_else(|| {
            MonitorError::unavailable(
                "netdev",
                format!("cannot find byte counter columns in {}", path.display()),
            )
        })?;

        log::debug!(
            "{}: rx bytes in column {}, tx bytes in column {}",
            path.display(),
            columns.rx,
            columns.tx
        );

        Ok(Self {
            path,
            reader,
            columns,
        })
    }

    fn rewind(&mut self) -> Result<()> {
        if self.reader.seek(SeekFrom::Start(0)).is_err() {
            self.reader = BufReader::new(File::open(&self.path)?);
        }
        Ok(())
    }
}

impl StatsSource for NetDevStats {
    fn name(&self) -> &'static str {
        "netdev"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Best
    }

    fn is_available() -> bool {
        Path::new(PROC_NET_DEV).exists()
    }

    fn sample(&mut self, interface: &str) -> Result<CounterSample> {
        self.rewind()?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(MonitorError::lookup_failed("netdev", interface));
            }
            if let Some(sample) = self.columns.parse_row(&line, interface) {
                return Ok(sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Inter-|   Receive                                                |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n";

    fn fixture(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}{}", HEADER, rows).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_header_columns() {
        let columns = ColumnMap::from_header(HEADER.lines().nth(1).unwrap()).unwrap();
        assert_eq!(columns, ColumnMap { rx: 1, tx: 9 });
    }

    #[test]
    fn test_header_first_and_second_bytes() {
        let columns = ColumnMap::from_header("face bytes packets bytes packets").unwrap();
        assert_eq!(columns, ColumnMap { rx: 1, tx: 3 });
    }

    #[test]
    fn test_header_single_bytes_column() {
        assert_eq!(ColumnMap::from_header("face |bytes packets|packets"), None);
    }

    #[test]
    fn test_parse_row() {
        let columns = ColumnMap { rx: 1, tx: 9 };
        let line = "  eth0: 9876543   12345    0    0    0     0          0         0  1234567    6789    0    0    0     0       0          0";

        assert_eq!(
            columns.parse_row(line, "eth0"),
            Some(CounterSample::new(9876543, 1234567))
        );
        assert_eq!(columns.parse_row(line, "eth1"), None);
    }

    #[test]
    fn test_parse_row_without_space_after_colon() {
        let columns = ColumnMap { rx: 1, tx: 9 };
        let line = "  eth0:9876543 12345 0 0 0 0 0 0 1234567 6789 0 0 0 0 0 0";

        assert_eq!(
            columns.parse_row(line, "eth0"),
            Some(CounterSample::new(9876543, 1234567))
        );
    }

    #[test]
    fn test_parse_row_truncated() {
        let columns = ColumnMap { rx: 1, tx: 9 };
        assert_eq!(columns.parse_row("  eth0: 100 2 0", "eth0"), None);
    }

    #[test]
    fn test_sample_rereads_file() {
        let file = fixture(
            "    lo:  500 5 0 0 0 0 0 0  500 5 0 0 0 0 0 0\n  eth0: 1000 10 0 0 0 0 0 0  2000 20 0 0 0 0 0 0\n",
        );
        let mut stats = NetDevStats::open_path(file.path()).unwrap();

        assert_eq!(stats.sample("eth0").unwrap(), CounterSample::new(1000, 2000));
        assert_eq!(stats.sample("lo").unwrap(), CounterSample::new(500, 500));

        std::fs::write(
            file.path(),
            format!(
                "{}  eth0: 4000 40 0 0 0 0 0 0  8000 80 0 0 0 0 0 0\n",
                HEADER
            ),
        )
        .unwrap();

        assert_eq!(stats.sample("eth0").unwrap(), CounterSample::new(4000, 8000));
        assert!(matches!(
            stats.sample("lo"),
            Err(MonitorError::LookupFailed { .. })
        ));
    }

    #[test]
    fn test_open_without_header_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "nothing to see here").unwrap();

        assert!(matches!(
            NetDevStats::open_path(file.path()),
            Err(MonitorError::Unavailable {
                backend: "netdev",
                ..
            })
        ));
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(matches!(
            NetDevStats::open_path("/nonexistent/net/dev"),
            Err(MonitorError::Unavailable { .. })
        ));
    }
}
