use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

const RACE_PASSAGES: [&str; 4] = [
    "The quick brown fox jumps over the lazy dog. This pangram contains every letter of the English alphabet at least once.",
    "Programming is the process of creating a set of instructions that tell a computer how to perform a task. Programming can be done using many programming languages.",
    "Typing is a skill that can be learned and improved with practice. The more you type, the faster and more accurate you will become.",
    "SwiftKeys is a platform designed to help you improve your typing speed and accuracy through competitive racing and structured learning.",
];

const DEFAULT_DRILL: &str = "Practice typing this text to improve your speed and accuracy.";

const HOME_ROW_HINT: &str = "Keep your fingers on the home row when not typing.";

/// Reference text a user has to reproduce. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Passage {
    text: Arc<str>,
    chars: Arc<[char]>,
}

impl Passage {
    /// Returns `None` for an empty text.
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref();
        if text.is_empty() {
            return None;
        }
        Some(Self::from_catalog(text))
    }

    fn from_catalog(text: &str) -> Self {
        debug_assert!(!text.is_empty());
        Self {
            text: Arc::from(text),
            chars: text.chars().collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Length in characters, not bytes.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }
}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lesson {
    pub id: u32,
    pub title: &'static str,
    pub level: Level,
    pub description: &'static str,
}

impl Lesson {
    /// Row drills get an extra reminder about finger placement.
    pub fn hint(&self) -> Option<&'static str> {
        (self.id <= 3).then_some(HOME_ROW_HINT)
    }

    pub fn passage(&self) -> Passage {
        passage_for_lesson(self.id)
    }
}

static LESSONS: [Lesson; 5] = [
    Lesson {
        id: 1,
        title: "Home Row Mastery",
        level: Level::Beginner,
        description: "Learn to type without looking at the keyboard by mastering the home row keys (ASDF JKL;).",
    },
    Lesson {
        id: 2,
        title: "Top Row Practice",
        level: Level::Beginner,
        description: "Practice typing with the top row keys (QWERTYUIOP) to build muscle memory.",
    },
    Lesson {
        id: 3,
        title: "Bottom Row Basics",
        level: Level::Beginner,
        description: "Complete your keyboard knowledge with the bottom row keys (ZXCVBNM).",
    },
    Lesson {
        id: 4,
        title: "Common Words",
        level: Level::Intermediate,
        description: "Improve your speed by practicing the most common words in English.",
    },
    Lesson {
        id: 5,
        title: "Numbers & Symbols",
        level: Level::Advanced,
        description: "Master typing numbers and special symbols for complete typing proficiency.",
    },
];

pub fn lessons() -> &'static [Lesson] {
    &LESSONS
}

pub fn lesson(id: u32) -> Option<&'static Lesson> {
    LESSONS.iter().find(|l| l.id == id)
}

pub fn race_passages() -> impl Iterator<Item = Passage> {
    RACE_PASSAGES.iter().map(|p| Passage::from_catalog(p))
}

/// Uniform pick from the race catalog.
pub fn pick_random_passage<R: Rng + ?Sized>(rng: &mut R) -> Passage {
    let text = RACE_PASSAGES
        .choose(rng)
        .copied()
        .unwrap_or(RACE_PASSAGES[0]);
    Passage::from_catalog(text)
}

/// Unknown ids degrade to a generic drill.
pub fn passage_for_lesson(lesson_id: u32) -> Passage {
    let text = match lesson_id {
        1 => "asdf jkl; asdf jkl; fjdk slal fjdk slal jfkd lsja jfkd lsja",
        2 => "qwerty uiop qwerty uiop qwer tyui opqw erty uiop",
        3 => "zxcv bnm zxcv bnm zxcv bnm zxcv bnm zxcv bnm",
        4 => "the and that have with this from they will not but what about which when make like time just know",
        5 => "1234 5678 90!@ #$%^ &*() 1234 5678 90!@ #$%^ &*()",
        _ => DEFAULT_DRILL,
    };
    Passage::from_catalog(text)
}
