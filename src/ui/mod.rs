pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, item_line, section, success, warn};
pub use table::{items_table, settings_table, TableBuilder};
pub use theme::{theme, Theme};
