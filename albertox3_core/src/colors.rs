//! Embed colours, Flat UI and Material palettes.

// flat ui
pub const TURQUOISE: u32 = 0x1abc9c;
pub const GREENSEA: u32 = 0x16a085;
pub const EMERLAND: u32 = 0x2ecc71;
pub const NEPHRITIS: u32 = 0x27ae60;
pub const PETERRIVER: u32 = 0x3498db;
pub const BELIZEHOLE: u32 = 0x2980b9;
pub const AMETHYST: u32 = 0x9b59b6;
pub const WISTERIA: u32 = 0x8e44ad;
pub const WETASPHALT: u32 = 0x34495e;
pub const MIDNIGHTBLUE: u32 = 0x2c3e50;
pub const SUNFLOWER: u32 = 0xf1c40f;
pub const CARROT: u32 = 0xe67e22;
pub const PUMPKIN: u32 = 0xd35400;
pub const ALIZARIN: u32 = 0xe74c3c;
pub const POMEGRANATE: u32 = 0xc0392b;
pub const CLOUDS: u32 = 0xecf0f1;
pub const SILVER: u32 = 0xbdc3c7;
pub const CONCRETE: u32 = 0x95a5a6;
pub const ASBESTOS: u32 = 0x7f8c8d;

// material, only the shades that are used somewhere
pub const TEAL_600: u32 = 0x00897b;
pub const RED_A700: u32 = 0xd50000;
pub const YELLOW_A200: u32 = 0xffff00;
pub const ORANGE_900: u32 = 0xe65100;
pub const LIGHTBLUE_900: u32 = 0x01579b;
pub const BLUEGREY_600: u32 = 0x546e7a;
pub const DEEPORANGE_A400: u32 = 0xff3d00;
pub const AMBER_500: u32 = 0xffc107;
pub const INDIGO_400: u32 = 0x5c6bc0;

pub const DEFAULT: u32 = TEAL_600;
pub const ERROR: u32 = RED_A700;
pub const WARNING: u32 = YELLOW_A200;
pub const ASSERTION: u32 = ORANGE_900;
pub const NOT_IMPLEMENTED: u32 = LIGHTBLUE_900;
pub const MAX_CONCURRENCY: u32 = BLUEGREY_600;
