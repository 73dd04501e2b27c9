//! Course transcript parsing: header metadata, lesson sections, chunks.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: <title>
//! Course Link: <url>
//! Course Instructor: <name>
//!
//! Lesson 0: <lesson title>
//! Lesson Link: <url>
//! <lesson body>
//! ```
//!
//! Anything the parser cannot attribute to a lesson lands in the course's
//! unlabeled bucket (`lesson_number = None`). Problems are reported as
//! warnings; processing a single document never fails.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::chunker::{split_into_chunks, ChunkSettings};
use super::types::{Course, CourseChunk, Lesson};

static COURSE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*course\s+title\s*:\s*(.*?)\s*$").expect("valid regex"));
static COURSE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*course\s+link\s*:\s*(.*?)\s*$").expect("valid regex"));
static COURSE_INSTRUCTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*course\s+instructor\s*:\s*(.*?)\s*$").expect("valid regex")
});
static LESSON_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*lesson\s+(\d+)\s*:\s*(.*?)\s*$").expect("valid regex")
});
static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*lesson\s+link\s*:\s*(.*?)\s*$").expect("valid regex"));
// Lines that start like a marker; used to spot malformed ones.
static LESSON_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*lesson\s+\S+.*:").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    settings: ChunkSettings,
}

/// Where the lines currently being read belong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Lesson(u32),
    Unlabeled,
}

#[derive(Debug)]
struct Section {
    target: Target,
    body: Vec<String>,
}

impl DocumentProcessor {
    pub fn new(settings: ChunkSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChunkSettings {
        &self.settings
    }

    /// Parses one course document. `source_name` (usually the file stem)
    /// stands in for the title when the header does not provide one.
    pub fn process(&self, source_name: &str, content: &str) -> ProcessedDocument {
        let mut warnings = Vec::new();
        let lines: Vec<&str> = content.lines().collect();

        let header_end = lines
            .iter()
            .position(|line| LESSON_LIKE.is_match(line))
            .unwrap_or(lines.len());

        let mut title = None;
        let mut course_link = None;
        let mut instructor = None;
        let mut preamble = Vec::new();

        for line in &lines[..header_end] {
            if let Some(value) = capture(&COURSE_TITLE, line) {
                title = non_empty(value);
            } else if let Some(value) = capture(&COURSE_LINK, line) {
                course_link = non_empty(value);
            } else if let Some(value) = capture(&COURSE_INSTRUCTOR, line) {
                instructor = non_empty(value);
            } else {
                preamble.push(line.to_string());
            }
        }

        let title = match title {
            Some(title) => title,
            None => {
                let fallback = source_name.trim().to_string();
                warnings.push(format!(
                    "missing 'Course Title:' header, using '{}'",
                    fallback
                ));
                fallback
            }
        };

        let mut course = Course {
            title,
            instructor,
            course_link,
            lessons: Vec::new(),
        };

        let mut sections = vec![Section {
            target: Target::Unlabeled,
            body: preamble,
        }];
        let mut seen_numbers = HashSet::new();
        let mut index = header_end;

        while index < lines.len() {
            let line = lines[index];
            index += 1;

            if let Some(caps) = LESSON_MARKER.captures(line) {
                let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                match number {
                    Some(number) if seen_numbers.insert(number) => {
                        let lesson_title = caps
                            .get(2)
                            .map(|m| m.as_str().to_string())
                            .filter(|t| !t.is_empty())
                            .unwrap_or_else(|| format!("Lesson {}", number));

                        let mut lesson_link = None;
                        if let Some(next) = lines.get(index) {
                            if let Some(link) = capture(&LESSON_LINK, next) {
                                lesson_link = non_empty(link);
                                index += 1;
                            }
                        }

                        course.lessons.push(Lesson {
                            lesson_number: number,
                            title: lesson_title,
                            lesson_link,
                        });
                        sections.push(Section {
                            target: Target::Lesson(number),
                            body: Vec::new(),
                        });
                        continue;
                    }
                    Some(number) => {
                        warnings.push(format!(
                            "duplicate lesson number {} at line {}, treating as unlabeled",
                            number, index
                        ));
                    }
                    None => {
                        warnings.push(format!(
                            "unusable lesson number at line {}, treating as unlabeled",
                            index
                        ));
                    }
                }
                start_unlabeled(&mut sections, line);
                continue;
            }

            if LESSON_LIKE.is_match(line) && !LESSON_LINK.is_match(line) {
                warnings.push(format!(
                    "malformed lesson marker at line {}: '{}'",
                    index,
                    line.trim()
                ));
                start_unlabeled(&mut sections, line);
                continue;
            }

            if let Some(section) = sections.last_mut() {
                section.body.push(line.to_string());
            }
        }

        let mut chunks = Vec::new();
        let mut unlabeled_text = false;
        for section in &sections {
            let body = section.body.join("\n");
            let body = body.trim();
            if body.is_empty() {
                continue;
            }

            let lesson_number = match section.target {
                Target::Lesson(number) => Some(number),
                Target::Unlabeled => {
                    unlabeled_text = true;
                    None
                }
            };

            for span in split_into_chunks(body, &self.settings) {
                chunks.push(CourseChunk {
                    content: span.text,
                    course_title: course.title.clone(),
                    lesson_number,
                    chunk_index: chunks.len(),
                });
            }
        }

        if course.lessons.is_empty() && unlabeled_text {
            warnings.push("no lesson markers found, content kept as unlabeled".to_string());
        }

        for warning in &warnings {
            tracing::warn!("{}: {}", course.title, warning);
        }

        ProcessedDocument {
            course,
            chunks,
            warnings,
        }
    }
}

fn start_unlabeled(sections: &mut Vec<Section>, line: &str) {
    sections.push(Section {
        target: Target::Unlabeled,
        body: vec![line.to_string()],
    });
}

fn capture<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
