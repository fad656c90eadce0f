use super::slashlink::Slashlink;
use super::slug::Slug;
use serde::{Deserialize, Serialize};

/// An address paired with a human title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryLink {
    pub address: Slashlink,
    pub title: String,
}

impl EntryLink {
    pub fn new(address: Slashlink, title: impl Into<String>) -> Self {
        Self {
            address,
            title: title.into(),
        }
    }

    /// Local link whose slug is derived from `title`.
    pub fn from_title(title: impl Into<String>) -> Self {
        let title = title.into();
        let address = Slashlink::local(Slug::format(&title));
        Self { address, title }
    }

    pub fn slug(&self) -> &Slug {
        self.address.slug()
    }
}

#[cfg(test)]
mod tests {
    use super::EntryLink;
    use crate::model::slashlink::Slashlink;

    #[test]
    fn from_title_derives_local_slug() {
        let link = EntryLink::from_title("The Whale, The Whale");
        assert_eq!(link.address, Slashlink::new("/the-whale-the-whale").unwrap());
        assert_eq!(link.title, "The Whale, The Whale");
    }

    #[test]
    fn from_title_falls_back_to_untitled() {
        let link = EntryLink::from_title("!!!");
        assert_eq!(link.slug().verbatim(), "untitled");
    }
}
