// Materialized columnar result tables.

/// Declared type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Real,
    Text,
}

/// Column payload: one equal-length data vector per column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Real(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    /// An empty vector of the given type.
    pub fn empty(ty: ColumnType) -> ColumnData {
        match ty {
            ColumnType::Int => ColumnData::Int(Vec::new()),
            ColumnType::Real => ColumnData::Real(Vec::new()),
            ColumnType::Text => ColumnData::Text(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Real(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Int(_) => ColumnType::Int,
            ColumnData::Real(_) => ColumnType::Real,
            ColumnData::Text(_) => ColumnType::Text,
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Column {
        Column {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }
}

/// An ordered sequence of named, typed, equal-length columns. Rows are
/// logical, addressed by position. Produced fresh by the execution bridge
/// per execution and owned by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// An empty table (no columns, no rows).
    pub fn new() -> Table {
        Table::default()
    }

    /// Assemble a table from (name, data) pairs. All vectors must already
    /// have equal length.
    pub fn from_columns(columns: Vec<(String, ColumnData)>) -> Table {
        Table {
            columns: columns
                .into_iter()
                .map(|(name, data)| Column { name, data })
                .collect(),
        }
    }

    /// Number of rows (length of the first column; zero when empty).
    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Name of the column at `idx`.
    pub fn col_name_str(&self, idx: usize) -> &str {
        self.columns.get(idx).map(|c| c.name.as_str()).unwrap_or("")
    }

    /// Declared type of the column at `idx`.
    pub fn col_type(&self, idx: usize) -> Option<ColumnType> {
        self.columns.get(idx).map(|c| c.data.column_type())
    }

    /// Index of the named column, case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Read an integer cell; `None` for out-of-range or non-Int columns.
    pub fn get_i64(&self, col: usize, row: usize) -> Option<i64> {
        match self.columns.get(col)?.data {
            ColumnData::Int(ref v) => v.get(row).copied(),
            _ => None,
        }
    }

    /// Read a floating-point cell; `None` for out-of-range or non-Real columns.
    pub fn get_f64(&self, col: usize, row: usize) -> Option<f64> {
        match self.columns.get(col)?.data {
            ColumnData::Real(ref v) => v.get(row).copied(),
            _ => None,
        }
    }

    /// Read a text cell; `None` for out-of-range or non-Text columns.
    pub fn get_str(&self, col: usize, row: usize) -> Option<&str> {
        match self.columns.get(col)?.data {
            ColumnData::Text(ref v) => v.get(row).map(|s| s.as_str()),
            _ => None,
        }
    }
}
