//! Text chunking.
//!
//! Splits extracted text into retrieval units of at most `max_chars`
//! characters: paragraphs are accumulated greedily, oversized paragraphs
//! fall back to sentence regrouping, and oversized sentences are
//! force-split into fixed-size slices. Pure and deterministic.

/// Split `text` into non-empty chunks of at most `max_chars` characters.
///
/// Lengths are counted in Unicode scalar values. Whitespace-only input
/// yields an empty Vec.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in split_paragraphs(text) {
        if char_len(&paragraph) > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            split_oversized_paragraph(&paragraph, max_chars, &mut chunks);
            continue;
        }

        if current.is_empty() {
            current = paragraph;
        } else if char_len(&current) + 2 + char_len(&paragraph) <= max_chars {
            current.push_str("\n\n");
            current.push_str(&paragraph);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = paragraph;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Paragraphs are separated by blank lines (two or more newlines).
fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Regroup an oversized paragraph by sentences; sentences that still
/// exceed the limit are force-split.
fn split_oversized_paragraph(paragraph: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut current = String::new();

    for sentence in split_sentences(paragraph) {
        if char_len(&sentence) > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            force_split(&sentence, max_chars, out);
            continue;
        }

        if current.is_empty() {
            current = sentence;
        } else if char_len(&current) + 1 + char_len(&sentence) <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            out.push(std::mem::take(&mut current));
            current = sentence;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
}

/// Split on `.`, `!` or `?` followed by whitespace (or end of input),
/// keeping the punctuation attached to its sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let ends_sentence = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1).map_or(true, |(_, next)| next.is_whitespace());

        if ends_sentence {
            let end = offset + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            i += 1;
            while i < chars.len() && chars[i].1.is_whitespace() {
                i += 1;
            }
            start = chars.get(i).map_or(text.len(), |(offset, _)| *offset);
            continue;
        }

        i += 1;
    }

    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }

    sentences
}

/// Fixed-size slices of exactly `max_chars` characters; the last slice
/// may be shorter. No word-boundary handling.
fn force_split(text: &str, max_chars: usize, out: &mut Vec<String>) {
    let chars: Vec<char> = text.chars().collect();
    for slice in chars.chunks(max_chars) {
        let piece: String = slice.iter().collect();
        if !piece.trim().is_empty() {
            out.push(piece);
        }
    }
}
