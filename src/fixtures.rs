//! Whitespace-separated numeric fixture files
//!
//! A fixture starts with a header holding its dimensions, followed by the values in row-major
//! order. Line breaks carry no meaning and `#` starts a comment.
//!
//! | Kind | Header | Values |
//! |------|--------|--------|
//! | vector | `n` | `n` |
//! | matrix | `rows cols` | `rows * cols` |
//! | system | `n` | `n` rows of `n` coefficients and the right hand side |
use crate::{
    config::Settings,
    error::{Error, Result},
    tasks::linear::LinearSystem,
    types::DenseMatrix,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

struct Tokens<'a> {
    tokens: Vec<(usize, &'a str)>,
    next: usize,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let tokens = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| {
                let content = line.split('#').next().unwrap_or("");
                content.split_whitespace().map(move |t| (i + 1, t))
            })
            .collect::<Vec<_>>();
        let last_line = text.lines().count().max(1);
        Self {
            tokens,
            next: 0,
            last_line,
        }
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let Some(&(line, token)) = self.tokens.get(self.next) else {
            return Err(Error::Fixture {
                line: self.last_line,
                message: format!("missing {what}"),
            });
        };
        self.next += 1;
        token.parse().map_err(|_| Error::Fixture {
            line,
            message: format!("cannot parse {what} from {token:?}"),
        })
    }

    fn values<T: FromStr>(&mut self, count: usize) -> Result<Vec<T>> {
        (0..count).map(|_| self.parse("value")).collect()
    }

    fn finish(&self) -> Result<()> {
        match self.tokens.get(self.next) {
            None => Ok(()),
            Some(&(line, token)) => Err(Error::Fixture {
                line,
                message: format!("unexpected trailing value {token:?}"),
            }),
        }
    }
}

/// Parse a vector fixture
pub fn parse_vector<T: FromStr>(text: &str) -> Result<Vec<T>> {
    let mut tokens = Tokens::new(text);
    let n = tokens.parse("length")?;
    let values = tokens.values(n)?;
    tokens.finish()?;
    Ok(values)
}

/// Parse a matrix fixture
pub fn parse_matrix<T: FromStr + Copy>(text: &str) -> Result<DenseMatrix<T>> {
    let mut tokens = Tokens::new(text);
    let rows = tokens.parse("row count")?;
    let cols = tokens.parse("column count")?;
    let values = tokens.values(rows * cols)?;
    tokens.finish()?;
    DenseMatrix::new(rows, cols, values)
}

/// Parse a linear system fixture
pub fn parse_system(text: &str) -> Result<LinearSystem> {
    let mut tokens = Tokens::new(text);
    let n: usize = tokens.parse("size")?;
    let mut matrix = Vec::with_capacity(n * n);
    let mut rhs = Vec::with_capacity(n);
    for _ in 0..n {
        matrix.extend(tokens.values::<f64>(n)?);
        rhs.push(tokens.parse("right hand side")?);
    }
    tokens.finish()?;
    Ok(LinearSystem::new(DenseMatrix::new(n, n, matrix)?, rhs))
}

/// Read a vector fixture
pub fn read_vector<T: FromStr>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    parse_vector(&fs::read_to_string(path)?)
}

/// Read a matrix fixture
pub fn read_matrix<T: FromStr + Copy>(path: impl AsRef<Path>) -> Result<DenseMatrix<T>> {
    parse_matrix(&fs::read_to_string(path)?)
}

/// Read a linear system fixture
pub fn read_system(path: impl AsRef<Path>) -> Result<LinearSystem> {
    parse_system(&fs::read_to_string(path)?)
}

/// Location of the fixture `file` of `task` under the data directory
pub fn task_data_path(settings: &Settings, task: &str, file: &str) -> PathBuf {
    settings.data_dir.join(task).join(file)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vector() {
        let v = parse_vector::<i32>("4\n3 -1\n# comment\n7 0 # trailing\n").unwrap();
        assert_eq!(v, vec![3, -1, 7, 0]);
    }

    #[test]
    fn test_matrix() {
        let m = parse_matrix::<f64>("2 3\n1 2 3\n4 5 6\n").unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_system() {
        let s = parse_system("2\n4 1 5\n2 5 7\n").unwrap();
        assert_eq!(s.matrix.data(), &[4.0, 1.0, 2.0, 5.0]);
        assert_eq!(s.rhs, vec![5.0, 7.0]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_vector::<f64>("3\n1.0 x 2.0"),
            Err(Error::Fixture { line: 2, .. })
        ));
        assert!(matches!(
            parse_vector::<f64>("3\n1.0\n2.0\n"),
            Err(Error::Fixture { line: 3, .. })
        ));
        assert!(matches!(
            parse_matrix::<i32>("1 1\n5\n6"),
            Err(Error::Fixture { line: 3, .. })
        ));
        assert!(matches!(
            parse_vector::<u8>(""),
            Err(Error::Fixture { line: 1, .. })
        ));
    }

    #[test]
    fn test_task_data_path() {
        let settings = Settings {
            data_dir: PathBuf::from("/data"),
            ..Settings::default()
        };
        assert_eq!(
            task_data_path(&settings, "sort", "input.txt"),
            PathBuf::from("/data/sort/input.txt")
        );
    }
}
