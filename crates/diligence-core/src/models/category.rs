//! Document categories
//!
//! Category/subcategory pairings are a closed set: each category owns a
//! storage bucket and the subcategories it accepts. An unknown pairing is a
//! type error or an explicit parse failure, never a missing map entry.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Revenue,
    Payroll,
    PurchaseOrder,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Revenue, Category::Payroll, Category::PurchaseOrder];

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Revenue => "Revenue",
            Category::Payroll => "Payroll",
            Category::PurchaseOrder => "Purchase Order",
        }
    }

    /// Storage bucket that holds this category's documents.
    pub fn bucket(&self) -> &'static str {
        match self {
            Category::Revenue => "revenue-documents",
            Category::Payroll => "payroll-documents",
            Category::PurchaseOrder => "purchase-order-documents",
        }
    }

    /// Subcategories accepted for this category.
    pub fn subcategories(&self) -> &'static [Subcategory] {
        match self {
            Category::Revenue => &[
                Subcategory::Agreement,
                Subcategory::Invoice,
                Subcategory::Sales,
            ],
            Category::Payroll => &[Subcategory::Master, Subcategory::Policies],
            Category::PurchaseOrder => &[
                Subcategory::Agreement,
                Subcategory::PurchaseOrder,
                Subcategory::Invoice,
                Subcategory::PurchaseRequest,
            ],
        }
    }

    pub fn allows(&self, subcategory: Subcategory) -> bool {
        self.subcategories().contains(&subcategory)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Category::Revenue => write!(f, "revenue"),
            Category::Payroll => write!(f, "payroll"),
            Category::PurchaseOrder => write!(f, "purchase-order"),
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "revenue" => Ok(Category::Revenue),
            "payroll" => Ok(Category::Payroll),
            "purchase-order" => Ok(Category::PurchaseOrder),
            _ => Err(anyhow::anyhow!("Invalid category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Subcategory {
    Agreement,
    Invoice,
    Sales,
    Master,
    Policies,
    #[serde(rename = "po")]
    PurchaseOrder,
    #[serde(rename = "pr")]
    PurchaseRequest,
}

impl Subcategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Subcategory::Agreement => "Agreement",
            Subcategory::Invoice => "Invoice",
            Subcategory::Sales => "Sales",
            Subcategory::Master => "Master",
            Subcategory::Policies => "HR Policies",
            Subcategory::PurchaseOrder => "Purchase Order",
            Subcategory::PurchaseRequest => "Purchase Request",
        }
    }
}

impl Display for Subcategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Subcategory::Agreement => write!(f, "agreement"),
            Subcategory::Invoice => write!(f, "invoice"),
            Subcategory::Sales => write!(f, "sales"),
            Subcategory::Master => write!(f, "master"),
            Subcategory::Policies => write!(f, "policies"),
            Subcategory::PurchaseOrder => write!(f, "po"),
            Subcategory::PurchaseRequest => write!(f, "pr"),
        }
    }
}

impl FromStr for Subcategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreement" => Ok(Subcategory::Agreement),
            "invoice" => Ok(Subcategory::Invoice),
            "sales" => Ok(Subcategory::Sales),
            "master" => Ok(Subcategory::Master),
            "policies" => Ok(Subcategory::Policies),
            "po" => Ok(Subcategory::PurchaseOrder),
            "pr" => Ok(Subcategory::PurchaseRequest),
            _ => Err(anyhow::anyhow!("Invalid subcategory: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_names() {
        assert_eq!(Category::Revenue.bucket(), "revenue-documents");
        assert_eq!(Category::Payroll.bucket(), "payroll-documents");
        assert_eq!(Category::PurchaseOrder.bucket(), "purchase-order-documents");
    }

    #[test]
    fn test_subcategory_pairings() {
        assert!(Category::Revenue.allows(Subcategory::Invoice));
        assert!(Category::Revenue.allows(Subcategory::Sales));
        assert!(!Category::Revenue.allows(Subcategory::Master));

        assert!(Category::Payroll.allows(Subcategory::Policies));
        assert!(!Category::Payroll.allows(Subcategory::Invoice));

        assert!(Category::PurchaseOrder.allows(Subcategory::PurchaseRequest));
        assert!(!Category::PurchaseOrder.allows(Subcategory::Sales));
    }

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            let parsed: Category = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_subcategory_round_trip() {
        for category in Category::ALL {
            for &subcategory in category.subcategories() {
                let parsed: Subcategory = subcategory.to_string().parse().unwrap();
                assert_eq!(parsed, subcategory);
            }
        }
    }

    #[test]
    fn test_invalid_category_rejected() {
        assert!("inventory".parse::<Category>().is_err());
        assert!("receipt".parse::<Subcategory>().is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Subcategory::Policies.display_name(), "HR Policies");
        assert_eq!(Category::PurchaseOrder.display_name(), "Purchase Order");
    }
}
