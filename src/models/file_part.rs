use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{
    part::{PartMeta, DEFAULT_BINARY_CONTENT_TYPE, DEFAULT_BINARY_TRANSFER_ENCODING},
    sealed::Sealed,
    PartBody,
};
use crate::error::MultipartError;

/// A part whose payload is read from a file when streaming reaches it.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub(crate) meta: PartMeta,
    path: PathBuf,
    pub(crate) file_name: Option<String>,
}

impl FilePart {
    /// Creates a file part.
    ///
    /// The `filename` attribute defaults to the last component of `path`. The file is
    /// not touched until its size or contents are needed.
    ///
    /// # Arguments
    ///
    /// * `name` - The form field name
    /// * `path` - Path of the file to send
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(ToString::to_string);

        Self {
            meta: PartMeta::new(
                name,
                DEFAULT_BINARY_CONTENT_TYPE,
                DEFAULT_BINARY_TRANSFER_ENCODING,
            ),
            path,
            file_name,
        }
    }

    /// Overrides the `filename` attribute of the `Content-Disposition` header.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Derives the content type from the file extension, keeping the current one
    /// when the extension is unknown.
    pub fn with_guessed_content_type(mut self) -> Self {
        if let Some(mime) = mime_guess::from_path(&self.path).first() {
            self.meta.content_type = mime.to_string();
        }
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn size(&self) -> Result<u64, MultipartError> {
        fs::metadata(&self.path)
            .map(|metadata| metadata.len())
            .map_err(|source| MultipartError::FileMetadata {
                path: self.path.clone(),
                source,
            })
    }

    pub(crate) fn open(&self) -> Result<PartBody, MultipartError> {
        let file = fs::File::open(&self.path).map_err(|source| MultipartError::FileOpen {
            path: self.path.clone(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| MultipartError::FileMetadata {
                path: self.path.clone(),
                source,
            })?
            .len();

        Ok(PartBody::file(&self.meta.name, file, len))
    }
}

impl Sealed for FilePart {
    fn meta_mut(&mut self) -> &mut PartMeta {
        &mut self.meta
    }
}
