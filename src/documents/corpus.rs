use std::ops::Range;

use super::ExtractedDocument;

const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Where one document's text sits inside the corpus, in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl DocumentSpan {
    #[inline]
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    fn intersects(&self, range: &Range<usize>) -> bool {
        self.start < self.end && self.start < range.end && range.start < self.end
    }
}

/// All extracted text of one processing run, concatenated in upload order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    text: String,
    spans: Vec<DocumentSpan>,
}

impl Corpus {
    /// Concatenate documents, separating non-empty texts with a blank line
    #[inline]
    pub fn from_documents(documents: &[ExtractedDocument]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(documents.len());
        let mut offset = 0;

        for document in documents {
            if !text.is_empty() && !document.text.is_empty() {
                text.push_str(DOCUMENT_SEPARATOR);
                offset += DOCUMENT_SEPARATOR.chars().count();
            }

            let start = offset;
            text.push_str(&document.text);
            offset += document.text.chars().count();

            spans.push(DocumentSpan {
                name: document.name.clone(),
                start,
                end: offset,
            });
        }

        Self { text, spans }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn spans(&self) -> &[DocumentSpan] {
        &self.spans
    }

    /// True when no document contributed anything but whitespace
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Indices of the documents whose text intersects the character range.
    ///
    /// A range that only covers a separator belongs to the document before it.
    #[inline]
    pub fn documents_in(&self, range: Range<usize>) -> Vec<usize> {
        let found = self
            .spans
            .iter()
            .enumerate()
            .filter(|(_, span)| span.intersects(&range))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        if !found.is_empty() || range.is_empty() {
            return found;
        }

        self.spans
            .iter()
            .rposition(|span| span.start < span.end && span.end <= range.start)
            .into_iter()
            .collect()
    }
}
