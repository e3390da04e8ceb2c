use crate::error::ScrapeError;
use crate::page::Page;
use crate::product::Product;
use crate::settings::Selectors;

/// Outcome of looking up one field on a listing element.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Found(T),
    Absent,
    Malformed { text: String, reason: String },
}

impl<T> Field<T> {
    /// Absence is an error for this field.
    pub fn require(self, field: &'static str, selector: &str) -> Result<T, ScrapeError> {
        match self {
            Field::Found(v) => Ok(v),
            Field::Absent => Err(ScrapeError::MissingField {
                field,
                selector: selector.to_string(),
            }),
            Field::Malformed { text, reason } => Err(ScrapeError::Parse {
                field,
                text,
                reason,
            }),
        }
    }

    /// Absence means "nothing there" and yields the default.
    pub fn or_default(self, field: &'static str) -> Result<T, ScrapeError>
    where
        T: Default,
    {
        match self {
            Field::Found(v) => Ok(v),
            Field::Absent => Ok(T::default()),
            Field::Malformed { text, reason } => Err(ScrapeError::Parse {
                field,
                text,
                reason,
            }),
        }
    }

    fn and_parse<U>(self, parse: impl FnOnce(&T) -> Result<U, String>) -> Field<U>
    where
        T: AsRef<str>,
    {
        match self {
            Field::Found(v) => match parse(&v) {
                Ok(parsed) => Field::Found(parsed),
                Err(reason) => Field::Malformed {
                    text: v.as_ref().to_string(),
                    reason,
                },
            },
            Field::Absent => Field::Absent,
            Field::Malformed { text, reason } => Field::Malformed { text, reason },
        }
    }
}

/// Price text such as `$1,139.54` → `1139.54`.
pub fn parse_price(text: &str) -> Result<f64, String> {
    let trimmed = text.trim();
    let digits: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let price: f64 = digits.parse().map_err(|e| format!("{e}"))?;
    if !price.is_finite() || price.is_sign_negative() {
        return Err(format!("{price} is not a valid price"));
    }
    Ok(price)
}

/// Review summary such as `12 reviews` → `12`.
pub fn parse_review_count(text: &str) -> Result<u32, String> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| "empty review summary".to_string())?;
    token.parse().map_err(|e| format!("{token:?}: {e}"))
}

async fn text_field<P: Page>(
    page: &P,
    root: &P::Node,
    selector: &str,
) -> Result<Field<String>, ScrapeError> {
    Ok(match page.find_one_in(root, selector).await? {
        Some(node) => Field::Found(page.text_of(&node).await?.trim().to_string()),
        None => Field::Absent,
    })
}

async fn attribute_field<P: Page>(
    page: &P,
    root: &P::Node,
    selector: &str,
    attribute: &str,
) -> Result<Field<String>, ScrapeError> {
    let Some(node) = page.find_one_in(root, selector).await? else {
        return Ok(Field::Absent);
    };
    Ok(match page.attribute_of(&node, attribute).await? {
        Some(value) => Field::Found(value),
        None => Field::Absent,
    })
}

async fn count_field<P: Page>(
    page: &P,
    root: &P::Node,
    selector: &str,
) -> Result<Field<u32>, ScrapeError> {
    let n = page.find_all_in(root, selector).await?.len();
    if n == 0 {
        return Ok(Field::Absent);
    }
    Ok(u32::try_from(n).map_or_else(
        |e| Field::Malformed {
            text: n.to_string(),
            reason: e.to_string(),
        },
        Field::Found,
    ))
}

/// Build one [`Product`] from a listing element.
pub async fn extract_product<P: Page>(
    page: &P,
    root: &P::Node,
    sel: &Selectors,
) -> Result<Product, ScrapeError> {
    let title = attribute_field(page, root, &sel.title, &sel.title_attribute)
        .await?
        .require("title", &sel.title)?;

    let description = text_field(page, root, &sel.description)
        .await?
        .require("description", &sel.description)?;

    let price = text_field(page, root, &sel.price)
        .await?
        .and_parse(|t| parse_price(t))
        .require("price", &sel.price)?;

    // Products without a ratings block simply have no markers.
    let rating = count_field(page, root, &sel.rating_marker)
        .await?
        .or_default("rating")?;

    let num_of_reviews = text_field(page, root, &sel.review_count)
        .await?
        .and_parse(|t| parse_review_count(t))
        .require("num_of_reviews", &sel.review_count)?;

    Ok(Product {
        title,
        description,
        price,
        rating,
        num_of_reviews,
    })
}
