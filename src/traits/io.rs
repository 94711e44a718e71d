//! RON import and export of task inputs
use crate::error::Result;
use std::fs;

pub trait RONExport: serde::Serialize {
    //! Export for RON

    /// Generate the RON string
    fn to_ron_string(&self) -> Result<String> {
        Ok(ron::to_string(self)?)
    }

    /// Export as RON
    fn export_as_ron(&self, filename: &str) -> Result<()> {
        fs::write(filename, self.to_ron_string()?)?;
        Ok(())
    }
}

pub trait RONImport: Sized + for<'de> serde::Deserialize<'de> {
    //! Import for RON

    /// Parse a RON string
    fn from_ron_string(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Import from a RON file
    fn import_from_ron(filename: &str) -> Result<Self> {
        let content = fs::read_to_string(filename)?;
        Self::from_ron_string(&content)
    }
}
