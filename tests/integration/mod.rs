mod driver_test;
