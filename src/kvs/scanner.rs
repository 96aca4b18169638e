use std::collections::VecDeque;
use std::future::Future;
use std::ops::Range;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;

use crate::err::Error;
use crate::kvs::session::ReadSession;
use crate::kvs::{Key, Val};

type Page = Result<Vec<(Key, Val)>, Error>;

/// An ordered cursor over a key range.
///
/// The cursor pulls one bounded page at a time from the session that
/// started it and buffers the results, so a long range never holds more
/// than one page in memory. Between pages the cursor only remembers the
/// narrowed range, which keeps it cheap to hold across awaits.
pub struct Scanner<'a, S> {
	/// The session the pages are read through
	session: &'a S,
	/// How many pairs one page may carry
	page_size: u32,
	/// The part of the range not yet fetched
	range: Range<Key>,
	/// Results of the current page not yet handed out
	buffered: VecDeque<(Key, Val)>,
	state: State<'a>,
}

enum State<'a> {
	/// No fetch underway; the next poll starts one
	Idle,
	/// A page fetch in flight
	Fetching(Pin<Box<dyn Future<Output = Page> + 'a>>),
	/// The range is drained, or an error ended the scan
	Done,
}

impl<'a, S: ReadSession> Scanner<'a, S> {
	pub(super) fn new(session: &'a S, page_size: u32, range: Range<Key>) -> Self {
		Scanner {
			session,
			page_size,
			range,
			buffered: VecDeque::new(),
			state: State::Idle,
		}
	}
}

impl<'a, S: ReadSession> Stream for Scanner<'a, S> {
	type Item = Result<(Key, Val), Error>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let this = self.get_mut();
		loop {
			// Hand out whatever the last page left over
			if let Some(pair) = this.buffered.pop_front() {
				return Poll::Ready(Some(Ok(pair)));
			}
			match &mut this.state {
				State::Done => return Poll::Ready(None),
				State::Idle => {
					let fetch = this.session.scan(this.range.clone(), this.page_size);
					this.state = State::Fetching(Box::pin(fetch));
				}
				State::Fetching(fetch) => match fetch.as_mut().poll(cx) {
					Poll::Pending => return Poll::Pending,
					Poll::Ready(Err(e)) => {
						this.state = State::Done;
						return Poll::Ready(Some(Err(e)));
					}
					Poll::Ready(Ok(page)) => {
						// A short page drains the range. A full one may have
						// more behind it, so narrow the range to resume there
						match page.last() {
							Some((last, _)) if page.len() == this.page_size as usize => {
								this.range.start = after(last);
								this.state = State::Idle;
							}
							_ => this.state = State::Done,
						}
						this.buffered.extend(page);
					}
				},
			}
		}
	}
}

/// The smallest key sorting strictly after `key`. User keys are arbitrary
/// byte strings, so that is the key itself with a zero byte appended;
/// resuming a scan there repeats nothing and skips nothing, not even a
/// sibling like `key 0x00` itself.
fn after(key: &[u8]) -> Key {
	let mut next = Vec::with_capacity(key.len() + 1);
	next.extend_from_slice(key);
	next.push(0x00);
	next
}
