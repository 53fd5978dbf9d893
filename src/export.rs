use std::fmt;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::{Offer, Result};

const COLUMNS: [&str; 4] = ["name", "price", "cards", "link"];

/// Writes a header row and one row per offer. Missing values are left as empty cells.
pub fn write_xlsx(path: impl AsRef<Path>, offers: &[Offer]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, title) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, title, &header)?;
    }

    for (row, offer) in (1u32..).zip(offers) {
        sheet.write_string(row, 0, &offer.name)?;
        if let Some(price) = offer.price {
            sheet.write_number(row, 1, price)?;
        }
        if let Some(cards) = offer.cards {
            sheet.write_number(row, 2, cards)?;
        }
        if let Some(link) = &offer.link {
            sheet.write_string(row, 3, link)?;
        }
    }
    sheet.autofit();

    workbook.save(path.as_ref())?;
    Ok(())
}

/// Plain text table of the results for the terminal.
pub struct OfferTable<'a>(pub &'a [Offer]);

impl fmt::Display for OfferTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .0
            .iter()
            .map(|offer| offer.name.chars().count())
            .chain([COLUMNS[0].len()])
            .max()
            .unwrap_or_default();
        let index_width = self.0.len().saturating_sub(1).to_string().len();

        let [name, price, cards, link] = COLUMNS;
        write!(
            f,
            "{:>index_width$}  {name:<name_width$}  {price:>9}  {cards:>5}  {link}",
            ""
        )?;
        for (idx, offer) in self.0.iter().enumerate() {
            let price = offer.price.map(|p| format!("{p:.2}")).unwrap_or_default();
            let cards = offer.cards.map(|c| c.to_string()).unwrap_or_default();
            let link = offer.link.as_deref().unwrap_or_default();
            write!(
                f,
                "\n{idx:>index_width$}  {:<name_width$}  {price:>9}  {cards:>5}  {link}",
                offer.name
            )?;
        }
        Ok(())
    }
}
