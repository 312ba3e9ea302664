//! Structural markup events consumed by the
//! [`Transducer`](crate::transducer::Transducer).
//!
//! This is a SAX-shaped event model: element starts and ends are paired,
//! CDATA content arrives as [`Event::Text`] between [`Event::CdataStart`] and
//! [`Event::CdataEnd`], and namespace declarations arrive as
//! [`Event::PrefixMapping`] before the element that declares them.

use crate::TemplateResult;

/// An attribute of an [`Event::ElementStart`], with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	pub namespace: Option<String>,
	pub local_name: String,
	pub value: String,
}

impl Attribute {
	pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			namespace: None,
			local_name: local_name.into(),
			value: value.into(),
		}
	}

	pub fn namespaced(
		namespace: impl Into<String>,
		local_name: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		Self {
			namespace: Some(namespace.into()),
			local_name: local_name.into(),
			value: value.into(),
		}
	}

	pub fn is_in(&self, namespace: &str) -> bool {
		self.namespace.as_deref() == Some(namespace)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	DocumentStart,
	ElementStart {
		namespace: Option<String>,
		local_name: String,
		attributes: Vec<Attribute>,
	},
	ElementEnd {
		namespace: Option<String>,
		local_name: String,
	},
	Text(String),
	Comment(String),
	CdataStart,
	CdataEnd,
	/// A `<!DOCTYPE>` declaration. Followed by [`Event::DtdEnd`] once the
	/// declaration (including any internal subset) is over.
	DtdStart {
		name: String,
		public_id: Option<String>,
		system_id: Option<String>,
	},
	DtdEnd,
	PrefixMapping {
		prefix: String,
		uri: String,
	},
	DocumentEnd,
}

impl Event {
	pub fn start(local_name: impl Into<String>) -> Self {
		Self::ElementStart {
			namespace: None,
			local_name: local_name.into(),
			attributes: Vec::new(),
		}
	}

	pub fn start_ns(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
		Self::ElementStart {
			namespace: Some(namespace.into()),
			local_name: local_name.into(),
			attributes: Vec::new(),
		}
	}

	pub fn end(local_name: impl Into<String>) -> Self {
		Self::ElementEnd {
			namespace: None,
			local_name: local_name.into(),
		}
	}

	pub fn end_ns(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
		Self::ElementEnd {
			namespace: Some(namespace.into()),
			local_name: local_name.into(),
		}
	}

	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(text.into())
	}

	/// Add an attribute to an [`Event::ElementStart`]; other events are
	/// returned unchanged.
	#[must_use]
	pub fn with_attribute(mut self, attribute: Attribute) -> Self {
		if let Self::ElementStart { attributes, .. } = &mut self {
			attributes.push(attribute);
		}

		self
	}
}

/// A forward-only supply of [`Event`]s.
pub trait EventSource {
	/// The next event, or `Ok(None)` once the input is exhausted.
	fn next_event(&mut self) -> TemplateResult<Option<Event>>;

	/// The 1-based line at which the most recently returned event begins.
	fn line(&self) -> Option<usize>;
}

/// An [`EventSource`] over an in-memory list of `(line, event)` pairs.
#[derive(Debug, Default)]
pub struct EventList {
	events: std::collections::VecDeque<(Option<usize>, Event)>,
	line: Option<usize>,
}

impl EventList {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn event(mut self, line: usize, event: Event) -> Self {
		self.events.push_back((Some(line), event));
		self
	}
}

impl FromIterator<(usize, Event)> for EventList {
	fn from_iter<I: IntoIterator<Item = (usize, Event)>>(events: I) -> Self {
		Self {
			events: events
				.into_iter()
				.map(|(line, event)| (Some(line), event))
				.collect(),
			line: None,
		}
	}
}

impl EventSource for EventList {
	fn next_event(&mut self) -> TemplateResult<Option<Event>> {
		Ok(self.events.pop_front().map(|(line, event)| {
			self.line = line;
			event
		}))
	}

	fn line(&self) -> Option<usize> {
		self.line
	}
}
