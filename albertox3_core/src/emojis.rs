macro_rules! define_symbol_constants {
    ($($name:ident => $value:expr),*) => {
        $(
            pub const $name: &str = $value;
        )*
    };
}

define_symbol_constants! {
    MONEYBAG => "💰",
    YEN => "💴",
    POUND => "💷",
    EURO => "💶",
    DOLLAR => "💵",
    QUESTION => "❓",
    CHECKMARK => "✅",
    X => "❌",
    ORANGE_DIAMOND => "🔸"
}
