use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    pub lesson_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique key of the course across the catalog.
    pub title: String,
    pub instructor: Option<String>,
    pub course_link: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instructor: None,
            course_link: None,
            lessons: Vec::new(),
        }
    }

    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|lesson| lesson.lesson_number == lesson_number)
    }
}

/// A span of course text prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    /// `None` places the chunk in the course's unlabeled bucket.
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Stable identifier, unique within the content collection. The title is
    /// kept verbatim; the index after the last `#` is always numeric.
    pub fn chunk_id(&self) -> String {
        format!("{}#{}", self.course_title, self.chunk_index)
    }

    /// Text handed to the embedder: the chunk prefixed with where it came from.
    pub fn embedding_text(&self) -> String {
        match self.lesson_number {
            Some(number) => format!(
                "Course {} Lesson {} content: {}",
                self.course_title, number, self.content
            ),
            None => format!("Course {} content: {}", self.course_title, self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_text_keeps_content_verbatim() {
        let chunk = CourseChunk {
            content: "Prompts are instructions.".to_string(),
            course_title: "Prompt Engineering".to_string(),
            lesson_number: Some(2),
            chunk_index: 7,
        };

        assert_eq!(
            chunk.embedding_text(),
            "Course Prompt Engineering Lesson 2 content: Prompts are instructions."
        );
        assert_eq!(chunk.chunk_id(), "Prompt Engineering#7");
    }

    #[test]
    fn chunk_ids_keep_titles_apart() {
        let chunk = |title: &str, index| CourseChunk {
            content: "Body".to_string(),
            course_title: title.to_string(),
            lesson_number: None,
            chunk_index: index,
        };
        assert_ne!(chunk("A B", 0).chunk_id(), chunk("A_B", 0).chunk_id());
        assert_ne!(chunk("Intro 1", 2).chunk_id(), chunk("Intro", 12).chunk_id());
    }

    #[test]
    fn lesson_lookup_by_number() {
        let mut course = Course::new("Intro");
        course.lessons.push(Lesson {
            lesson_number: 3,
            title: "Tools".to_string(),
            lesson_link: None,
        });

        assert_eq!(course.lesson(3).map(|l| l.title.as_str()), Some("Tools"));
        assert!(course.lesson(1).is_none());
    }
}
