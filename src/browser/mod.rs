//! 浏览器会话的建立：连接已有浏览器或启动新进程

mod connection;
mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;
