use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    Email,
    Date,
}

impl SortBy {
    /// Value of the `sort_by` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Name => "user_name",
            SortBy::Email => "email",
            SortBy::Date => "date_added",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Email => "E-mail",
            SortBy::Date => "Date",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "user_name" => Ok(SortBy::Name),
            "email" | "e-mail" => Ok(SortBy::Email),
            "date" | "date_added" => Ok(SortBy::Date),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Order::Asc => Order::Desc,
            Order::Desc => Order::Asc,
        }
    }

    fn arrow(&self) -> &'static str {
        match self {
            Order::Asc => "↑",
            Order::Desc => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub by: SortBy,
    pub order: Order,
}

impl Sort {
    /// Re-selecting the active field flips its order; a new field starts ascending.
    pub fn toggle(current: Option<Sort>, by: SortBy) -> Sort {
        match current {
            Some(s) if s.by == by => Sort {
                by,
                order: s.order.flipped(),
            },
            _ => Sort {
                by,
                order: Order::Asc,
            },
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.by.label(), self.order.arrow())
    }
}

/// Parameters of one list request. Page and sort are independent: both are
/// always sent together when a sort is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub sort: Option<Sort>,
}

impl PageQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string())];
        if let Some(sort) = self.sort {
            pairs.push(("sort_by", sort.by.as_str().to_string()));
            pairs.push(("order", sort.order.as_str().to_string()));
        }
        pairs
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort: None,
        }
    }
}

/// Pagination and sort state confirmed by the last successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page: u32,
    pub total_pages: u32,
    pub sort: Option<Sort>,
}

impl Cursor {
    pub fn query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            sort: self.sort,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            sort: None,
        }
    }
}
