use crate::mml::event::Event;

/// A named, fully expanded event sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    name: Box<[u8]>,
    body: Vec<Event>,
}

impl Macro {
    /// The macro name without the sigil
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The expanded body
    pub fn body(&self) -> &[Event] {
        &self.body
    }
}

#[doc = r#"
The macros known to a parse.

Bodies are stored already expanded, so a macro can only use macros
defined before it. Names are compared byte for byte.

# Example
```rust
# use mml2midi::mml::parser::MacroTable;
# use mml2midi::prelude::*;
let mut table = MacroTable::default();
table.define(b"x", vec![Event::EndOfTrack]);
assert_eq!(table.get(b"x"), Some(&[Event::EndOfTrack][..]));
assert!(table.get(b"X").is_none());
```
"#]
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: Vec<Macro>,
}

impl MacroTable {
    /// Register `body` under `name`.
    ///
    /// A previous definition with the same name is replaced, and its body
    /// returned.
    pub fn define(&mut self, name: &[u8], body: Vec<Event>) -> Option<Vec<Event>> {
        match self.macros.iter_mut().find(|m| *m.name == *name) {
            Some(existing) => Some(core::mem::replace(&mut existing.body, body)),
            None => {
                self.macros.push(Macro {
                    name: name.into(),
                    body,
                });
                None
            }
        }
    }

    /// The body of the macro called `name`
    pub fn get(&self, name: &[u8]) -> Option<&[Event]> {
        self.macros
            .iter()
            .find(|m| *m.name == *name)
            .map(|m| m.body.as_slice())
    }

    /// Number of macros defined
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// True if no macro is defined
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Iterate the macros in definition order
    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.iter()
    }
}

#[test]
fn redefinition_replaces_the_body() {
    use crate::mml::event::{Command, Control};
    let mut table = MacroTable::default();
    let first = vec![Event::from(Control::new(Command::Octave, 3))];
    let second = vec![Event::from(Control::new(Command::Octave, 5))];

    assert_eq!(table.define(b"oct", first.clone()), None);
    assert_eq!(table.define(b"oct", second.clone()), Some(first));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(b"oct"), Some(second.as_slice()));
}
