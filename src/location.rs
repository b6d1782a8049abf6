//! Parse-time position tracking for diagnostics.
//!
//! The struct walker pushes a frame whenever it descends into a map
//! (`start_object`) or a list (`start_array`) and names the frame as it visits
//! each field or element. Rendering the stack gives a path such as
//! `spec.instances[0].actions[2].timeout` that points at the offending input.
//!
//! Frames are left in place when the walker bails out with an error, so the
//! rendered location is always the deepest point reached.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Field(Option<String>),
    Index(Option<usize>),
}

/// A stack of field/index frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    frames: Vec<Frame>,
}

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn start_object(&mut self) {
        self.frames.push(Frame::Field(None));
    }

    pub fn end_object(&mut self) {
        self.frames.pop();
    }

    /// Name the current object frame. Ignored when the current frame is an array.
    pub fn set_field(&mut self, name: &str) {
        if let Some(Frame::Field(field)) = self.frames.last_mut() {
            *field = Some(name.to_string());
        }
    }

    pub fn start_array(&mut self) {
        self.frames.push(Frame::Index(None));
    }

    pub fn end_array(&mut self) {
        self.frames.pop();
    }

    /// Set the element index of the current array frame. Ignored when the
    /// current frame is an object.
    pub fn set_index(&mut self, index: usize) {
        if let Some(Frame::Index(slot)) = self.frames.last_mut() {
            *slot = Some(index);
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            match frame {
                Frame::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name.as_deref().unwrap_or(""))?;
                }
                Frame::Index(Some(index)) => write!(f, "[{index}]")?,
                Frame::Index(None) => {}
            }
        }
        Ok(())
    }
}
