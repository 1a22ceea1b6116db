//! Fixed-size pages over a snapshot of items.
//!
//! The paginator owns the list it was built from, so inserts that land after
//! construction never move items between its pages.

#[derive(Debug, Clone)]
pub struct Paginator<T> {
    items: Vec<T>,
    per_page: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
}

impl<T: Clone> Paginator<T> {
    pub fn new(items: Vec<T>, per_page: usize) -> Self {
        Paginator {
            items,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Always at least one page, even when empty.
    pub fn num_pages(&self) -> usize {
        self.items.len().div_ceil(self.per_page).max(1)
    }

    /// Resolves a raw page parameter leniently: anything non-numeric gives the
    /// first page, a number out of range gives the last one.
    pub fn get_page(&self, raw: Option<&str>) -> Page<T> {
        let number = match raw.map(str::trim) {
            Some(s) if is_integer(s) => match s.parse::<i64>() {
                Ok(n) if n >= 1 && (n as u64) <= self.num_pages() as u64 => n as usize,
                // Too small, too large, or too long for i64
                _ => self.num_pages(),
            },
            _ => 1,
        };
        self.page(number)
    }

    fn page(&self, number: usize) -> Page<T> {
        let start = (number - 1) * self.per_page;
        let items = self
            .items
            .iter()
            .skip(start)
            .take(self.per_page)
            .cloned()
            .collect();
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            count: self.count(),
        }
    }
}

/// An optionally signed run of ASCII digits.
fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous().then_some(self.number - 1)
    }

    /// Replaces the items while keeping the page position, dropping any item
    /// the mapper rejects.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<Option<U>, E>) -> Result<Page<U>, E> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            if let Some(mapped) = f(item)? {
                items.push(mapped);
            }
        }
        Ok(Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        })
    }
}
